//! # Shared Types Crate
//!
//! Contracts shared between the host runtime and feature modules.
//!
//! ## Design Principles
//!
//! - **Storage is a port**: modules see [`StorageHandle`] and [`Table`], never
//!   a concrete driver.
//! - **Schemas are declared**: each module lists the tables it owns as
//!   [`SchemaDescriptor`]s and the handle keeps migration idempotent.
//! - **One error type**: every storage failure is a [`StorageError`].
//! - **One error body**: handlers answer with [`ApiError`] and read bodies
//!   through [`ValidatedJson`].

pub mod errors;
pub mod handle;
pub mod http;
pub mod storage;

pub use errors::*;
pub use http::{ApiError, FieldErrors, ValidatedJson};
pub use handle::{MigrationReport, SchemaDescriptor, StorageHandle, Table};
pub use storage::{BatchOperation, InMemoryKVStore, KeyValueStore};
