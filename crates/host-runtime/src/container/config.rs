//! # Host Configuration
//!
//! Unified configuration for the server, storage, connection pool and event
//! bus, read from an optional TOML file and `HOST_` environment overrides.
//!
//! ```toml
//! [server]
//! app_name = "modular-host"
//! port = 8080
//! api_version = "1"
//! http_timeout = 30
//!
//! [database]
//! driver = "memory"
//!
//! [bus]
//! capacity = 100
//! ```
//!
//! Nested keys are overridden with a double underscore:
//! `HOST_SERVER__PORT=9000`, `HOST_DATABASE__DRIVER=rocksdb`.

use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// File read when no path is given; absent is fine.
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "HOST";

/// Complete host configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// HTTP server configuration.
    pub server: ServerConfig,
    /// Storage driver configuration.
    pub database: DatabaseConfig,
    /// Connection pool limits.
    pub pool: PoolConfig,
    /// Event bus configuration.
    pub bus: BusConfig,
}

impl HostConfig {
    /// Load from `path` (required when given, otherwise the optional
    /// [`DEFAULT_CONFIG_FILE`]) and apply `HOST_` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::new(DEFAULT_CONFIG_FILE, FileFormat::Toml).required(false),
        };

        let config: Self = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document without consulting the environment.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let config: Self = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Check values the type system cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be non-zero".into()));
        }
        if self.server.api_version.trim().is_empty() {
            return Err(ConfigError::Invalid("server.api_version must not be empty".into()));
        }
        if self.server.http_timeout == 0 {
            return Err(ConfigError::Invalid("server.http_timeout must be non-zero".into()));
        }
        if self.database.driver.trim().is_empty() {
            return Err(ConfigError::Invalid("database.driver must not be empty".into()));
        }
        self.pool.validate()?;
        Ok(())
    }

    /// Mount point of every module's routes, e.g. `/api/v1`.
    #[must_use]
    pub fn api_base_path(&self) -> String {
        format!("/api/v{}", self.server.api_version.trim())
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A source could not be read or did not match the schema.
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Service name; root of every module logger.
    pub app_name: String,
    /// Listen address.
    pub host: String,
    /// Listen port.
    pub port: u16,
    /// Routes are mounted under `/api/v{api_version}`.
    pub api_version: String,
    /// Per-request timeout in seconds.
    pub http_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            app_name: "modular-host".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8080,
            api_version: "1".to_string(),
            http_timeout: 30,
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout)
    }

    /// `host:port` for binding.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Storage driver configuration.
///
/// `name` is the database name for networked drivers and the data directory
/// for embedded ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    #[serde(alias = "db_driver")]
    pub driver: String,
    #[serde(alias = "db_host")]
    pub host: String,
    #[serde(alias = "db_port")]
    pub port: u16,
    #[serde(alias = "db_name")]
    pub name: String,
    #[serde(alias = "db_username")]
    pub username: String,
    #[serde(alias = "db_password")]
    pub password: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: "memory".to_string(),
            host: "localhost".to_string(),
            port: 0,
            name: "./data/host".to_string(),
            username: String::new(),
            password: String::new(),
        }
    }
}

/// Connection pool limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    #[serde(alias = "conn_idle")]
    pub max_idle: u32,
    #[serde(alias = "conn_max")]
    pub max_open: u32,
    /// Seconds a connection may be reused.
    #[serde(alias = "conn_lifetime")]
    pub max_lifetime: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle: 5,
            max_open: 10,
            max_lifetime: 300,
        }
    }
}

impl PoolConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_open == 0 {
            return Err(ConfigError::Invalid("pool.max_open must be non-zero".into()));
        }
        if self.max_idle > self.max_open {
            return Err(ConfigError::Invalid(format!(
                "pool.max_idle ({}) exceeds pool.max_open ({})",
                self.max_idle, self.max_open
            )));
        }
        Ok(())
    }
}

/// Event bus configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Events buffered before publishers wait.
    pub capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            capacity: shared_bus::DEFAULT_QUEUE_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = HostConfig::default();
        assert_eq!(config.server.app_name, "modular-host");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.database.driver, "memory");
        assert_eq!(config.bus.capacity, 100);
        assert_eq!(config.api_base_path(), "/api/v1");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = HostConfig::from_toml_str(
            r#"
            [server]
            port = 9000
            api_version = "2"

            [bus]
            capacity = 8
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.api_base_path(), "/api/v2");
        assert_eq!(config.bus.capacity, 8);
        assert_eq!(config.pool, PoolConfig::default());
    }

    #[test]
    fn test_legacy_key_names() {
        let config = HostConfig::from_toml_str(
            r#"
            [database]
            db_driver = "memory"
            db_name = "app"

            [pool]
            conn_idle = 2
            conn_max = 4
            conn_lifetime = 60
            "#,
        )
        .unwrap();

        assert_eq!(config.database.name, "app");
        assert_eq!(config.pool.max_idle, 2);
        assert_eq!(config.pool.max_open, 4);
        assert_eq!(config.pool.max_lifetime, 60);
    }

    #[test]
    fn test_validation_failures() {
        for toml in [
            "[server]\nport = 0",
            "[server]\napi_version = \"\"",
            "[server]\nhttp_timeout = 0",
            "[pool]\nmax_idle = 20\nmax_open = 10",
            "[pool]\nmax_open = 0\nmax_idle = 0",
        ] {
            let result = HostConfig::from_toml_str(toml);
            assert!(
                matches!(result, Err(ConfigError::Invalid(_))),
                "expected rejection for {toml:?}"
            );
        }
    }

    #[test]
    fn test_malformed_value_is_load_error() {
        let result = HostConfig::from_toml_str("[server]\nport = \"not a port\"");
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }

    #[test]
    fn test_load_from_file_with_env_override() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[server]\nport = 7000\napp_name = \"from-file\"").unwrap();

        std::env::set_var("HOST_BUS__CAPACITY", "17");
        let result = HostConfig::load(Some(file.path()));
        std::env::remove_var("HOST_BUS__CAPACITY");

        let config = result.unwrap();
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.server.app_name, "from-file");
        assert_eq!(config.bus.capacity, 17);
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let result = HostConfig::load(Some(Path::new("/nonexistent/host.toml")));
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }
}
