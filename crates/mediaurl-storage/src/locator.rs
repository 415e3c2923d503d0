//! Reference string classification.
//!
//! Every reference handed to the resolver goes through [`LocatorParser::parse`]
//! exactly once. The rules are tried in order and the first match wins:
//!
//! 1. `scheme://container/key` with the configured scheme → [`ObjectLocator::Canonical`]
//! 2. an `http(s)` URL whose path contains a legacy storage marker followed by
//!    a trailing path → [`ObjectLocator::Legacy`]
//! 3. anything else → [`ObjectLocator::Opaque`]
//!
//! Parsing never fails; an unrecognized string is valid input that the
//! resolver hands back unchanged.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::types::ObjectLocator;

/// Parser configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Scheme of canonical references (`store` matches `store://bucket/key`).
    #[serde(default = "default_scheme")]
    pub scheme: String,

    /// Path markers that identify historical storage URLs. The remainder of
    /// the path after the marker is the object key.
    #[serde(default = "default_legacy_markers")]
    pub legacy_markers: Vec<String>,
}

fn default_scheme() -> String {
    "store".to_string()
}

fn default_legacy_markers() -> Vec<String> {
    vec![
        "/storage/v1/object/public/".to_string(),
        "/storage/v1/object/sign/".to_string(),
    ]
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            scheme: default_scheme(),
            legacy_markers: default_legacy_markers(),
        }
    }
}

/// Classifies reference strings into [`ObjectLocator`]s.
#[derive(Debug, Clone)]
pub struct LocatorParser {
    prefix: String,
    legacy_markers: Vec<String>,
}

impl LocatorParser {
    /// Creates a parser from configuration.
    pub fn new(config: &ParserConfig) -> Self {
        Self {
            prefix: format!("{}://", config.scheme),
            legacy_markers: config
                .legacy_markers
                .iter()
                .filter(|m| !m.is_empty())
                .cloned()
                .collect(),
        }
    }

    /// Parses a reference string.
    pub fn parse(&self, reference: &str) -> ObjectLocator {
        if let Some(locator) = self.parse_canonical(reference) {
            return locator;
        }
        if let Some(locator) = self.parse_legacy(reference) {
            return locator;
        }
        ObjectLocator::Opaque(reference.to_string())
    }

    fn parse_canonical(&self, reference: &str) -> Option<ObjectLocator> {
        let rest = reference.strip_prefix(&self.prefix)?;
        let (container, key) = rest.split_once('/')?;
        let key = key.trim_start_matches('/');
        if container.is_empty() || key.is_empty() {
            return None;
        }
        Some(ObjectLocator::Canonical {
            container: container.to_string(),
            key: key.to_string(),
        })
    }

    fn parse_legacy(&self, reference: &str) -> Option<ObjectLocator> {
        let url = Url::parse(reference).ok()?;
        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }

        // Url::path() excludes query and fragment.
        let path = url.path();
        let trailing = self
            .legacy_markers
            .iter()
            .find_map(|marker| path.find(marker.as_str()).map(|at| &path[at + marker.len()..]))?;

        let trailing = trailing.trim_matches('/');
        if trailing.is_empty() {
            return None;
        }

        let key = urlencoding::decode(trailing)
            .map(|decoded| decoded.into_owned())
            .unwrap_or_else(|_| trailing.to_string());

        Some(ObjectLocator::Legacy { key })
    }
}

impl Default for LocatorParser {
    fn default() -> Self {
        Self::new(&ParserConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical() {
        let parser = LocatorParser::default();
        assert_eq!(
            parser.parse("store://bucket/a.jpg"),
            ObjectLocator::Canonical {
                container: "bucket".into(),
                key: "a.jpg".into(),
            }
        );
        assert_eq!(
            parser.parse("store://bucket/users/42/avatar.png"),
            ObjectLocator::Canonical {
                container: "bucket".into(),
                key: "users/42/avatar.png".into(),
            }
        );
    }

    #[test]
    fn test_canonical_requires_container_and_key() {
        let parser = LocatorParser::default();
        assert!(parser.parse("store://bucket").is_opaque());
        assert!(parser.parse("store://bucket/").is_opaque());
        assert!(parser.parse("store:///a.jpg").is_opaque());
        assert!(parser.parse("store://").is_opaque());
    }

    #[test]
    fn test_legacy_public_url() {
        let parser = LocatorParser::default();
        let locator = parser.parse(
            "https://abc.supabase.co/storage/v1/object/public/generations/u1/out.png?t=123",
        );
        assert_eq!(
            locator,
            ObjectLocator::Legacy {
                key: "generations/u1/out.png".into()
            }
        );
    }

    #[test]
    fn test_legacy_signed_url_is_percent_decoded() {
        let parser = LocatorParser::default();
        let locator = parser.parse(
            "https://abc.supabase.co/storage/v1/object/sign/media/my%20photo.jpg?token=x",
        );
        assert_eq!(
            locator,
            ObjectLocator::Legacy {
                key: "media/my photo.jpg".into()
            }
        );
    }

    #[test]
    fn test_legacy_marker_without_path_is_opaque() {
        let parser = LocatorParser::default();
        assert!(
            parser
                .parse("https://abc.supabase.co/storage/v1/object/public/")
                .is_opaque()
        );
    }

    #[test]
    fn test_unrecognized_is_opaque() {
        let parser = LocatorParser::default();
        for reference in [
            "https://cdn.example.com/logo.png",
            "",
            "not a url",
            "s3://bucket/key",
            "ftp://host/storage/v1/object/public/a.jpg",
        ] {
            assert_eq!(
                parser.parse(reference),
                ObjectLocator::Opaque(reference.to_string()),
                "{reference}"
            );
        }
    }

    #[test]
    fn test_custom_scheme() {
        let parser = LocatorParser::new(&ParserConfig {
            scheme: "media".into(),
            legacy_markers: vec![],
        });
        assert!(matches!(
            parser.parse("media://b/k"),
            ObjectLocator::Canonical { .. }
        ));
        assert!(parser.parse("store://b/k").is_opaque());
    }
}
