//! Configuration management for CPSU services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default.toml, config/{APP_ENV}.toml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Object storage configuration (S3)
    #[serde(default)]
    pub storage: StorageConfig,

    /// Citation metadata API configuration
    #[serde(default)]
    pub scopus: ScopusConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Maximum accepted body size for multipart uploads
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Allowed CORS origins; empty allows any origin
    #[serde(default = "default_cors_origins")]
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Full connection URL; when absent the URL is composed from the parts below
    pub url: Option<String>,

    #[serde(default = "default_db_host")]
    pub host: String,

    #[serde(default = "default_db_port")]
    pub port: u16,

    #[serde(default = "default_db_user")]
    pub user: String,

    #[serde(default)]
    pub password: String,

    #[serde(default = "default_db_name")]
    pub name: String,

    #[serde(default = "default_ssl_mode")]
    pub ssl_mode: String,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Maximum connection lifetime in seconds
    #[serde(default = "default_max_lifetime")]
    pub max_lifetime_secs: u64,

    /// Interval between liveness pings in seconds (0 disables the keep-alive task)
    #[serde(default = "default_keepalive_interval")]
    pub keepalive_interval_secs: u64,

    /// Apply pending migrations on startup
    #[serde(default = "default_run_migrations")]
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Bucket that receives uploaded images and documents
    #[serde(default = "default_bucket")]
    pub bucket: String,

    #[serde(default = "default_region")]
    pub region: String,

    /// Static credentials; when absent the default AWS provider chain is used
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,

    /// Custom endpoint (MinIO, LocalStack)
    pub endpoint: Option<String>,

    /// Public URL prefix for stored objects; defaults to the virtual-hosted S3 URL
    pub public_base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScopusConfig {
    /// API key for the Elsevier search API
    pub api_key: Option<String>,

    #[serde(default = "default_scopus_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_scopus_timeout")]
    pub timeout_secs: u64,

    /// Publications kept per personnel during a full sync
    #[serde(default = "default_sync_limit")]
    pub sync_limit: usize,

    /// Request timeout for the research sync routes, which make one
    /// upstream call per personnel
    #[serde(default = "default_sync_timeout")]
    pub sync_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 5 }
fn default_max_upload_bytes() -> usize { 20 * 1024 * 1024 }
fn default_cors_origins() -> Vec<String> { vec!["http://localhost:3000".to_string()] }
fn default_db_host() -> String { "localhost".to_string() }
fn default_db_port() -> u16 { 5432 }
fn default_db_user() -> String { "postgres".to_string() }
fn default_db_name() -> String { "cpsu".to_string() }
fn default_ssl_mode() -> String { "disable".to_string() }
fn default_max_connections() -> u32 { 25 }
fn default_min_connections() -> u32 { 10 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_max_lifetime() -> u64 { 300 }
fn default_keepalive_interval() -> u64 { 10 }
fn default_run_migrations() -> bool { true }
fn default_bucket() -> String { "cpsu-website".to_string() }
fn default_region() -> String { "ap-southeast-2".to_string() }
fn default_scopus_base_url() -> String { "https://api.elsevier.com/content/search/scopus".to_string() }
fn default_scopus_timeout() -> u64 { 15 }
fn default_sync_limit() -> usize { 5 }
fn default_sync_timeout() -> u64 { 600 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_service_name() -> String { "cpsu-api".to_string() }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // e.g., APP__DATABASE__HOST=db
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors_allowed_origins")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }
}

impl DatabaseConfig {
    /// Connection URL, composed from host/user/name when no explicit URL is set
    pub fn connection_url(&self) -> String {
        if let Some(url) = self.url.as_deref().filter(|u| !u.is_empty()) {
            return url.to_string();
        }

        let auth = if self.password.is_empty() {
            self.user.clone()
        } else {
            format!("{}:{}", self.user, self.password)
        };

        format!(
            "postgres://{}@{}:{}/{}?sslmode={}",
            auth, self.host, self.port, self.name, self.ssl_mode
        )
    }

    pub fn keepalive_interval(&self) -> Option<Duration> {
        (self.keepalive_interval_secs > 0).then(|| Duration::from_secs(self.keepalive_interval_secs))
    }
}

impl ScopusConfig {
    /// Never shorter than one upstream call
    pub fn sync_timeout(&self) -> Duration {
        Duration::from_secs(self.sync_timeout_secs.max(self.timeout_secs))
    }
}

impl StorageConfig {
    /// Public URL of an object stored under `key`
    pub fn object_url(&self, key: &str) -> String {
        match self.public_base_url.as_deref() {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), key),
            None => format!("https://{}.s3.{}.amazonaws.com/{}", self.bucket, self.region, key),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            max_upload_bytes: default_max_upload_bytes(),
            cors_allowed_origins: default_cors_origins(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: default_db_host(),
            port: default_db_port(),
            user: default_db_user(),
            password: String::new(),
            name: default_db_name(),
            ssl_mode: default_ssl_mode(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            max_lifetime_secs: default_max_lifetime(),
            keepalive_interval_secs: default_keepalive_interval(),
            run_migrations: default_run_migrations(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: default_bucket(),
            region: default_region(),
            access_key_id: None,
            secret_access_key: None,
            endpoint: None,
            public_base_url: None,
        }
    }
}

impl Default for ScopusConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_scopus_base_url(),
            timeout_secs: default_scopus_timeout(),
            sync_limit: default_sync_limit(),
            sync_timeout_secs: default_sync_timeout(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            service_name: default_service_name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.database.max_connections, 25);
        assert_eq!(config.storage.bucket, "cpsu-website");
        assert_eq!(config.scopus.sync_limit, 5);
    }

    #[test]
    fn test_connection_url_composed_from_parts() {
        let config = DatabaseConfig::default();
        assert_eq!(
            config.connection_url(),
            "postgres://postgres@localhost:5432/cpsu?sslmode=disable"
        );

        let with_password = DatabaseConfig {
            password: "secret".into(),
            host: "db".into(),
            ..DatabaseConfig::default()
        };
        assert_eq!(
            with_password.connection_url(),
            "postgres://postgres:secret@db:5432/cpsu?sslmode=disable"
        );
    }

    #[test]
    fn test_explicit_url_wins() {
        let config = DatabaseConfig {
            url: Some("postgres://app@primary/cpsu".into()),
            ..DatabaseConfig::default()
        };
        assert_eq!(config.connection_url(), "postgres://app@primary/cpsu");
    }

    #[test]
    fn test_keepalive_disabled_at_zero() {
        let config = DatabaseConfig {
            keepalive_interval_secs: 0,
            ..DatabaseConfig::default()
        };
        assert!(config.keepalive_interval().is_none());
        assert_eq!(
            DatabaseConfig::default().keepalive_interval(),
            Some(Duration::from_secs(10))
        );
    }

    #[test]
    fn test_sync_timeout_covers_one_upstream_call() {
        let config = ScopusConfig::default();
        assert_eq!(config.sync_timeout(), Duration::from_secs(600));

        let short = ScopusConfig {
            sync_timeout_secs: 5,
            timeout_secs: 15,
            ..ScopusConfig::default()
        };
        assert_eq!(short.sync_timeout(), Duration::from_secs(15));
    }

    #[test]
    fn test_object_url() {
        let mut storage = StorageConfig::default();
        assert_eq!(
            storage.object_url("images/news/a.jpg"),
            "https://cpsu-website.s3.ap-southeast-2.amazonaws.com/images/news/a.jpg"
        );

        storage.public_base_url = Some("https://cdn.example.org/".into());
        assert_eq!(
            storage.object_url("images/news/a.jpg"),
            "https://cdn.example.org/images/news/a.jpg"
        );
    }
}
