//! # Shared Storage Handle
//!
//! The host opens one [`StorageHandle`] at start-up and passes clones of it to
//! every module. Clones share the same backend; the host never mutates the
//! handle after opening it, and each module owns the discipline of its own
//! tables.
//!
//! ## Key Layout
//!
//! | Prefix | Contents |
//! |--------|----------|
//! | `s/{table}` | Recorded schema version (u32, big endian) |
//! | `t/{table}/{key}` | Row bytes |

use crate::errors::StorageError;
use crate::storage::{BatchOperation, InMemoryKVStore, KeyValueStore};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

const SCHEMA_PREFIX: &str = "s/";
const TABLE_PREFIX: &str = "t/";

/// A table and the schema version a module expects it at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaDescriptor {
    pub table: &'static str,
    pub version: u32,
}

impl SchemaDescriptor {
    pub const fn new(table: &'static str, version: u32) -> Self {
        Self { table, version }
    }
}

/// Outcome of [`StorageHandle::apply_migrations`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Tables created or upgraded by this call.
    pub applied: Vec<SchemaDescriptor>,
    /// Tables already at the requested version.
    pub unchanged: Vec<SchemaDescriptor>,
}

struct StorageInner {
    driver: String,
    store: Arc<dyn KeyValueStore>,
    /// Serializes check-then-write in migrations.
    migration_lock: Mutex<()>,
}

/// Shared, cheaply clonable reference to the opened storage backend.
#[derive(Clone)]
pub struct StorageHandle {
    inner: Arc<StorageInner>,
}

impl StorageHandle {
    /// Wrap an opened backend.
    pub fn new(driver: impl Into<String>, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            inner: Arc::new(StorageInner {
                driver: driver.into(),
                store,
                migration_lock: Mutex::new(()),
            }),
        }
    }

    /// Fresh in-memory storage.
    pub fn in_memory() -> Self {
        Self::new("memory", Arc::new(InMemoryKVStore::new()))
    }

    /// Name of the driver backing this handle.
    pub fn driver(&self) -> &str {
        &self.inner.driver
    }

    /// Bring every table in `schemas` to its requested version.
    ///
    /// Idempotent: a table already at the requested version is left alone.
    /// Requesting an older version than recorded fails before anything is
    /// written; all version records are committed in one atomic batch.
    pub fn apply_migrations(
        &self,
        schemas: &[SchemaDescriptor],
    ) -> Result<MigrationReport, StorageError> {
        let _guard = self.inner.migration_lock.lock();
        let mut report = MigrationReport::default();
        // Versions accepted earlier in this call, not yet written.
        let mut pending: HashMap<&'static str, u32> = HashMap::new();

        for schema in schemas {
            validate_table_name(schema.table)?;

            let current = match pending.get(schema.table) {
                Some(version) => Some(*version),
                None => self.schema_version(schema.table)?,
            };

            match current {
                Some(recorded) if recorded == schema.version => report.unchanged.push(*schema),
                Some(recorded) if recorded > schema.version => {
                    return Err(StorageError::SchemaDowngrade {
                        table: schema.table.to_string(),
                        recorded,
                        requested: schema.version,
                    });
                }
                _ => {
                    pending.insert(schema.table, schema.version);
                    report.applied.push(*schema);
                }
            }
        }

        if !pending.is_empty() {
            let batch = pending
                .iter()
                .map(|(table, version)| {
                    BatchOperation::put(schema_key(table), version.to_be_bytes().to_vec())
                })
                .collect();
            self.inner.store.atomic_batch_write(batch)?;
        }

        for schema in &report.applied {
            info!(table = schema.table, version = schema.version, "Schema migrated");
        }
        for schema in &report.unchanged {
            debug!(table = schema.table, version = schema.version, "Schema up to date");
        }

        Ok(report)
    }

    /// Recorded schema version of `table`, if it was ever migrated.
    pub fn schema_version(&self, table: &str) -> Result<Option<u32>, StorageError> {
        let Some(bytes) = self.inner.store.get(&schema_key(table))? else {
            return Ok(None);
        };
        let raw: [u8; 4] = bytes.as_slice().try_into().map_err(|_| {
            StorageError::Corrupted(format!("schema version for {table} has {} bytes", bytes.len()))
        })?;
        Ok(Some(u32::from_be_bytes(raw)))
    }

    /// Every migrated table and its version, sorted by name.
    pub fn tables(&self) -> Result<Vec<(String, u32)>, StorageError> {
        self.inner
            .store
            .prefix_scan(SCHEMA_PREFIX.as_bytes())?
            .into_iter()
            .map(|(key, value)| {
                let name = String::from_utf8_lossy(&key[SCHEMA_PREFIX.len()..]).into_owned();
                let raw: [u8; 4] = value
                    .as_slice()
                    .try_into()
                    .map_err(|_| StorageError::Corrupted(format!("schema version for {name}")))?;
                Ok((name, u32::from_be_bytes(raw)))
            })
            .collect()
    }

    /// Open a migrated table.
    pub fn table(&self, name: &str) -> Result<Table, StorageError> {
        validate_table_name(name)?;
        if self.schema_version(name)?.is_none() {
            return Err(StorageError::UnknownTable(name.to_string()));
        }
        Ok(Table {
            prefix: format!("{TABLE_PREFIX}{name}/"),
            name: name.to_string(),
            store: Arc::clone(&self.inner.store),
        })
    }
}

impl fmt::Debug for StorageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageHandle")
            .field("driver", &self.inner.driver)
            .finish_non_exhaustive()
    }
}

/// Row access to one migrated table.
#[derive(Clone)]
pub struct Table {
    name: String,
    prefix: String,
    store: Arc<dyn KeyValueStore>,
}

impl Table {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.store.get(&self.row_key(key))
    }

    pub fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        self.store.put(&self.row_key(key), value)
    }

    /// Delete a row. Returns whether it existed.
    pub fn delete(&self, key: &str) -> Result<bool, StorageError> {
        self.store.delete(&self.row_key(key))
    }

    /// All rows in key order.
    pub fn list(&self) -> Result<Vec<(String, Vec<u8>)>, StorageError> {
        let rows = self.store.prefix_scan(self.prefix.as_bytes())?;
        Ok(rows
            .into_iter()
            .map(|(key, value)| {
                let key = String::from_utf8_lossy(&key[self.prefix.len()..]).into_owned();
                (key, value)
            })
            .collect())
    }

    fn row_key(&self, key: &str) -> Vec<u8> {
        let mut full = Vec::with_capacity(self.prefix.len() + key.len());
        full.extend_from_slice(self.prefix.as_bytes());
        full.extend_from_slice(key.as_bytes());
        full
    }
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table").field("name", &self.name).finish()
    }
}

fn schema_key(table: &str) -> Vec<u8> {
    format!("{SCHEMA_PREFIX}{table}").into_bytes()
}

fn validate_table_name(name: &str) -> Result<(), StorageError> {
    if name.is_empty() || name.contains('/') {
        return Err(StorageError::InvalidTableName(name.to_string()));
    }
    Ok(())
}
