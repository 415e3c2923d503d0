use mediaurl_storage::{ParserConfig, S3SignerConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Longest validity S3-compatible presigners accept (7 days).
pub const MAX_URL_TTL_SECS: u64 = 7 * 24 * 3600;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ResolverConfig {
    /// Cache tier settings
    #[serde(default)]
    pub cache: CacheConfig,
    /// Redis configuration (distributed tier)
    #[serde(default)]
    pub redis: RedisConfig,
    /// Origin signer configuration
    #[serde(default)]
    pub signer: SignerConfig,
    /// Reference parsing rules
    #[serde(default)]
    pub parser: ParserConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ResolverConfig {
    pub fn validate(&self) -> Result<(), String> {
        // Cache validations
        if self.cache.url_ttl_secs == 0 {
            return Err("cache.url_ttl_secs must be > 0".into());
        }
        if self.cache.url_ttl_secs > MAX_URL_TTL_SECS {
            return Err(format!(
                "cache.url_ttl_secs must be <= {MAX_URL_TTL_SECS} (7 days)"
            ));
        }
        if self.cache.safety_buffer_secs >= self.cache.url_ttl_secs {
            return Err("cache.safety_buffer_secs must be < cache.url_ttl_secs".into());
        }
        if self.cache.distributed_deadline_ms == 0 {
            return Err("cache.distributed_deadline_ms must be > 0".into());
        }
        if self.cache.local_max_entries == 0 {
            return Err("cache.local_max_entries must be > 0".into());
        }
        if self.cache.background_max_in_flight == 0 {
            return Err("cache.background_max_in_flight must be > 0".into());
        }
        // Redis validations
        if self.redis.enabled && self.redis.url.is_empty() {
            return Err("redis.enabled=true requires redis.url".into());
        }
        if self.redis.pool_size == 0 {
            return Err("redis.pool_size must be > 0".into());
        }
        // Signer validations
        if self.signer.default_container.is_empty() {
            return Err("signer.default_container must not be empty".into());
        }
        match self.signer.backend {
            SignerBackend::Local => {
                if self.signer.local.secret.is_empty() {
                    return Err("signer.local.secret must not be empty".into());
                }
            }
            SignerBackend::S3 => {
                if self.signer.s3.is_none() {
                    return Err("signer.backend=s3 requires [signer.s3]".into());
                }
            }
        }
        // Parser validation
        if self.parser.scheme.is_empty() {
            return Err("parser.scheme must not be empty".into());
        }
        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        Ok(())
    }
}

/// Cache tier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Validity requested from the signer for new URLs, in seconds
    #[serde(default = "default_url_ttl_secs")]
    pub url_ttl_secs: u64,

    /// URLs expiring within this margin are treated as already expired
    #[serde(default = "default_safety_buffer_secs")]
    pub safety_buffer_secs: u64,

    /// Local (L1) cache max entries
    #[serde(default = "default_local_max_entries")]
    pub local_max_entries: usize,

    /// Interval of the local expired-entry sweep. 0 disables the sweeper.
    #[serde(default = "default_local_sweep_interval_secs")]
    pub local_sweep_interval_secs: u64,

    /// Deadline for the distributed bulk read, in milliseconds
    #[serde(default = "default_distributed_deadline_ms")]
    pub distributed_deadline_ms: u64,

    /// Prefix applied to every distributed-tier key
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Cap on concurrent fire-and-forget distributed writes
    #[serde(default = "default_background_max_in_flight")]
    pub background_max_in_flight: usize,
}

fn default_url_ttl_secs() -> u64 {
    3600 // 1 hour
}

fn default_safety_buffer_secs() -> u64 {
    300 // 5 minutes
}

fn default_local_max_entries() -> usize {
    10000
}

fn default_local_sweep_interval_secs() -> u64 {
    60
}

fn default_distributed_deadline_ms() -> u64 {
    2000
}

fn default_key_prefix() -> String {
    "signed-url:".to_string()
}

fn default_background_max_in_flight() -> usize {
    64
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url_ttl_secs: default_url_ttl_secs(),
            safety_buffer_secs: default_safety_buffer_secs(),
            local_max_entries: default_local_max_entries(),
            local_sweep_interval_secs: default_local_sweep_interval_secs(),
            distributed_deadline_ms: default_distributed_deadline_ms(),
            key_prefix: default_key_prefix(),
            background_max_in_flight: default_background_max_in_flight(),
        }
    }
}

impl CacheConfig {
    pub fn url_ttl(&self) -> Duration {
        Duration::from_secs(self.url_ttl_secs)
    }

    pub fn safety_buffer(&self) -> Duration {
        Duration::from_secs(self.safety_buffer_secs)
    }

    pub fn distributed_deadline(&self) -> Duration {
        Duration::from_millis(self.distributed_deadline_ms)
    }

    pub fn local_sweep_interval(&self) -> Option<Duration> {
        (self.local_sweep_interval_secs > 0)
            .then(|| Duration::from_secs(self.local_sweep_interval_secs))
    }
}

/// Redis configuration for the shared cache tier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Enable Redis (gracefully degrades without it)
    /// Default: false (local tier only)
    #[serde(default = "default_redis_enabled")]
    pub enabled: bool,

    /// Redis connection URL (e.g., "redis://localhost:6379")
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Connection pool size
    #[serde(default = "default_redis_pool_size")]
    pub pool_size: usize,

    /// Connection timeout in milliseconds
    #[serde(default = "default_redis_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_redis_enabled() -> bool {
    false
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_redis_pool_size() -> usize {
    10
}

fn default_redis_timeout_ms() -> u64 {
    5000
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: default_redis_enabled(),
            url: default_redis_url(),
            pool_size: default_redis_pool_size(),
            timeout_ms: default_redis_timeout_ms(),
        }
    }
}

/// Which origin signer to use
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SignerBackend {
    /// HMAC-signed URLs served by a trusted file server
    #[default]
    Local,
    /// S3-compatible presigned URLs (requires the `s3` feature)
    S3,
}

/// Origin signer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignerConfig {
    #[serde(default)]
    pub backend: SignerBackend,

    /// Container used for legacy references, which carry only a key
    #[serde(default = "default_container")]
    pub default_container: String,

    #[serde(default)]
    pub local: LocalSignerConfig,

    #[serde(default)]
    pub s3: Option<S3SignerConfig>,
}

fn default_container() -> String {
    "media".to_string()
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            backend: SignerBackend::default(),
            default_container: default_container(),
            local: LocalSignerConfig::default(),
            s3: None,
        }
    }
}

/// Settings for the local HMAC signer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalSignerConfig {
    #[serde(default = "default_local_base_url")]
    pub base_url: String,
    /// Shared secret. Override via MEDIAURL__SIGNER__LOCAL__SECRET.
    #[serde(default = "default_local_secret")]
    pub secret: String,
}

fn default_local_base_url() -> String {
    "http://localhost:8080/files".to_string()
}

fn default_local_secret() -> String {
    "change-me".to_string()
}

impl Default for LocalSignerConfig {
    fn default() -> Self {
        Self {
            base_url: default_local_base_url(),
            secret: default_local_secret(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub mod loader {
    use super::ResolverConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    pub fn load_config(path: Option<&str>) -> Result<ResolverConfig, String> {
        let mut builder = Config::builder();
        match path {
            Some(p) => {
                let pathbuf = PathBuf::from(p);
                if !pathbuf.exists() {
                    return Err(format!("config file not found: {p}"));
                }
                builder = builder.add_source(File::from(pathbuf));
            }
            None => {
                // Try default root-level file
                let default_path = PathBuf::from("mediaurl.toml");
                if default_path.exists() {
                    builder = builder.add_source(File::from(default_path));
                }
            }
        }
        // Environment variable overrides, e.g., MEDIAURL__REDIS__ENABLED=true
        builder = builder.add_source(
            Environment::with_prefix("MEDIAURL")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: ResolverConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ResolverConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cache.distributed_deadline(), Duration::from_secs(2));
        assert_eq!(config.cache.safety_buffer(), Duration::from_secs(300));
        assert!(!config.redis.enabled);
        assert_eq!(config.signer.backend, SignerBackend::Local);
    }

    #[test]
    fn test_safety_buffer_must_be_below_ttl() {
        let mut config = ResolverConfig::default();
        config.cache.safety_buffer_secs = config.cache.url_ttl_secs;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_url_ttl_upper_bound() {
        let mut config = ResolverConfig::default();
        config.cache.url_ttl_secs = MAX_URL_TTL_SECS;
        assert!(config.validate().is_ok());

        config.cache.url_ttl_secs = 400_000_000_000;
        let err = config.validate().unwrap_err();
        assert!(err.contains("url_ttl_secs"));
    }

    #[test]
    fn test_s3_backend_requires_section() {
        let mut config = ResolverConfig::default();
        config.signer.backend = SignerBackend::S3;
        let err = config.validate().unwrap_err();
        assert!(err.contains("signer.s3"));
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = ResolverConfig::default();
        config.logging.level = "loud".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sweep_interval_zero_disables() {
        let mut config = CacheConfig::default();
        assert_eq!(config.local_sweep_interval(), Some(Duration::from_secs(60)));
        config.local_sweep_interval_secs = 0;
        assert_eq!(config.local_sweep_interval(), None);
    }

    #[test]
    fn test_parse_toml_sections() {
        let toml = r#"
            [cache]
            url_ttl_secs = 600
            safety_buffer_secs = 60

            [redis]
            enabled = true
            url = "redis://cache:6379"

            [signer]
            backend = "s3"
            default_container = "uploads"

            [signer.s3]
            endpoint = "http://minio:9000"
            access_key = "minio"
            secret_key = "minio123"
        "#;
        let cfg = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap();
        let parsed: ResolverConfig = cfg.try_deserialize().unwrap();

        assert_eq!(parsed.cache.url_ttl_secs, 600);
        assert_eq!(parsed.cache.distributed_deadline_ms, 2000);
        assert!(parsed.redis.enabled);
        assert_eq!(parsed.signer.backend, SignerBackend::S3);
        let s3 = parsed.signer.s3.as_ref().unwrap();
        assert_eq!(s3.region, "us-east-1");
        assert!(s3.path_style);
        assert!(parsed.validate().is_ok());
    }
}
