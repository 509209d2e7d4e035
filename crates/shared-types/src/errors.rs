//! # Error Types
//!
//! Defines error types used by the storage port and every module that touches
//! the shared storage handle.

use thiserror::Error;

/// Errors from the storage collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// The configured driver is not compiled in or not known.
    #[error("Unsupported storage driver: {0}")]
    UnsupportedDriver(String),

    /// The storage backend could not be opened.
    #[error("Failed to open storage: {0}")]
    Open(String),

    /// Connection or pool settings are inconsistent.
    #[error("Invalid storage configuration: {0}")]
    InvalidConfig(String),

    /// A table was used before its schema was migrated.
    #[error("Unknown table: {0} (no migration applied)")]
    UnknownTable(String),

    /// Table names must be non-empty and must not contain `/`.
    #[error("Invalid table name: {0:?}")]
    InvalidTableName(String),

    /// A migration asked for an older schema than the one recorded.
    #[error("Schema downgrade for table {table}: recorded v{recorded}, requested v{requested}")]
    SchemaDowngrade {
        table: String,
        recorded: u32,
        requested: u32,
    },

    /// Stored bytes could not be interpreted.
    #[error("Corrupted storage record: {0}")]
    Corrupted(String),

    /// The backend reported an I/O failure.
    #[error("Storage backend error: {0}")]
    Backend(String),
}
