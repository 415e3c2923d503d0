//! Tracing setup for binaries embedding the resolver.
//!
//! Log lines go to stderr so that command output on stdout stays parseable.
//! The filter sits behind a reload layer: a process can start logging before
//! its configuration is loaded and adjust the level afterwards.

use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

use crate::config::LoggingConfig;

static FILTER_HANDLE: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();

/// A valid `RUST_LOG` directive, if one is set.
fn env_directive(value: Option<String>) -> Option<EnvFilter> {
    value
        .filter(|v| !v.trim().is_empty())
        .and_then(|v| EnvFilter::try_new(v).ok())
}

fn rust_log() -> Option<EnvFilter> {
    env_directive(std::env::var(EnvFilter::DEFAULT_ENV).ok())
}

/// Install the global subscriber. `RUST_LOG`, when set and valid, wins over
/// `level`. Calling this twice is harmless; the first subscriber stays.
pub fn init_tracing_with_level(level: &str) {
    let filter = rust_log().unwrap_or_else(|| EnvFilter::new(level));

    let (filter_layer, handle) = reload::Layer::new(filter);
    if FILTER_HANDLE.set(handle).is_err() {
        return;
    }

    let _ = tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}

/// Switch the active level, e.g. once configuration has been read.
/// A no-op if tracing was not initialized through this module.
pub fn apply_logging_level(level: &str) {
    let Some(handle) = FILTER_HANDLE.get() else {
        return;
    };
    if let Err(e) = handle.modify(|filter| *filter = EnvFilter::new(level)) {
        tracing::warn!(level, error = %e, "failed to change log level");
    }
}

/// Apply the configured level unless `RUST_LOG` already chose one.
pub fn apply_logging_config(config: &LoggingConfig) {
    if rust_log().is_some() {
        tracing::debug!(configured = %config.level, "RUST_LOG set, keeping its filter");
        return;
    }
    apply_logging_level(&config.level);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_directive_requires_valid_value() {
        assert!(env_directive(None).is_none());
        assert!(env_directive(Some("  ".into())).is_none());
        assert!(env_directive(Some("mediaurl=loudest".into())).is_none());
        assert!(env_directive(Some("debug".into())).is_some());
        assert!(env_directive(Some("mediaurl_resolver=trace,warn".into())).is_some());
    }
}
