//! # Storage Drivers
//!
//! Opens the storage backend named by `database.driver`.
//!
//! | Driver | Backend | Availability |
//! |--------|---------|--------------|
//! | `memory` | [`InMemoryKVStore`] | always |
//! | `rocksdb` | [`RocksDbStore`] at `database.name` | `rocksdb` cargo feature |
//!
//! Both drivers are in-process, so pool limits are validated and logged but
//! not otherwise used.

#[cfg(feature = "rocksdb")]
pub mod rocksdb_adapter;

#[cfg(feature = "rocksdb")]
pub use rocksdb_adapter::{RocksDbConfig, RocksDbStore};

use std::sync::Arc;

use shared_types::{InMemoryKVStore, StorageError, StorageHandle};
use tracing::info;

use crate::container::{DatabaseConfig, PoolConfig};

pub const DRIVER_MEMORY: &str = "memory";
pub const DRIVER_ROCKSDB: &str = "rocksdb";

/// Open the configured backend and wrap it in a shared handle.
pub fn open_storage(
    database: &DatabaseConfig,
    pool: &PoolConfig,
) -> Result<StorageHandle, StorageError> {
    pool.validate()
        .map_err(|e| StorageError::InvalidConfig(e.to_string()))?;

    let driver = database.driver.trim().to_ascii_lowercase();
    let handle = match driver.as_str() {
        DRIVER_MEMORY => StorageHandle::new(DRIVER_MEMORY, Arc::new(InMemoryKVStore::new())),
        DRIVER_ROCKSDB => open_rocksdb(database)?,
        other => return Err(StorageError::UnsupportedDriver(other.to_string())),
    };

    info!(
        driver = %handle.driver(),
        max_open = pool.max_open,
        max_idle = pool.max_idle,
        max_lifetime_secs = pool.max_lifetime,
        "Storage attached"
    );
    Ok(handle)
}

#[cfg(feature = "rocksdb")]
fn open_rocksdb(database: &DatabaseConfig) -> Result<StorageHandle, StorageError> {
    let store = RocksDbStore::open(RocksDbConfig::new(&database.name))?;
    Ok(StorageHandle::new(DRIVER_ROCKSDB, Arc::new(store)))
}

#[cfg(not(feature = "rocksdb"))]
fn open_rocksdb(_database: &DatabaseConfig) -> Result<StorageHandle, StorageError> {
    Err(StorageError::UnsupportedDriver(format!(
        "{DRIVER_ROCKSDB} (built without the `rocksdb` feature)"
    )))
}
