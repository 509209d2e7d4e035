//! # Host Container
//!
//! Configuration shared by the host and its infrastructure.

pub mod config;

pub use config::{BusConfig, ConfigError, DatabaseConfig, HostConfig, PoolConfig, ServerConfig};
