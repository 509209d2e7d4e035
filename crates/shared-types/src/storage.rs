//! # Storage Port
//!
//! Abstract key-value interface every storage driver implements, plus the
//! in-memory driver used for development and tests.

use crate::errors::StorageError;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Abstract interface for key-value storage backends.
///
/// Implementations are shared across modules, so every method takes `&self`
/// and the backend is responsible for its own synchronization.
pub trait KeyValueStore: Send + Sync {
    /// Get a value by key.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;

    /// Put a single key-value pair.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError>;

    /// Delete a key. Returns whether it existed.
    fn delete(&self, key: &[u8]) -> Result<bool, StorageError>;

    /// Execute an atomic batch write.
    ///
    /// Either all operations in the batch are applied, or none are.
    fn atomic_batch_write(&self, operations: Vec<BatchOperation>) -> Result<(), StorageError>;

    /// Iterate over keys with a prefix, in key order.
    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError>;
}

/// Batch operation for atomic writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOperation {
    /// Put a key-value pair.
    Put { key: Vec<u8>, value: Vec<u8> },
    /// Delete a key.
    Delete { key: Vec<u8> },
}

impl BatchOperation {
    /// Create a Put operation.
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Create a Delete operation.
    pub fn delete(key: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Delete { key: key.into() }
    }
}

/// In-memory key-value store.
#[derive(Debug, Default)]
pub struct InMemoryKVStore {
    data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl InMemoryKVStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl KeyValueStore for InMemoryKVStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.data.read().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        self.data.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<bool, StorageError> {
        Ok(self.data.write().remove(key).is_some())
    }

    fn atomic_batch_write(&self, operations: Vec<BatchOperation>) -> Result<(), StorageError> {
        // A single write lock makes the whole batch visible at once.
        let mut data = self.data.write();
        for op in operations {
            match op {
                BatchOperation::Put { key, value } => {
                    data.insert(key, value);
                }
                BatchOperation::Delete { key } => {
                    data.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        let data = self.data.read();
        let results = data
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_delete() {
        let store = InMemoryKVStore::new();
        store.put(b"a", b"1").unwrap();

        assert_eq!(store.get(b"a").unwrap(), Some(b"1".to_vec()));
        assert!(store.delete(b"a").unwrap());
        assert!(!store.delete(b"a").unwrap());
        assert_eq!(store.get(b"a").unwrap(), None);
    }

    #[test]
    fn test_prefix_scan_is_ordered_and_bounded() {
        let store = InMemoryKVStore::new();
        store.put(b"t/users/b", b"2").unwrap();
        store.put(b"t/users/a", b"1").unwrap();
        store.put(b"t/usersx/c", b"3").unwrap();
        store.put(b"s/users", b"v").unwrap();

        let rows = store.prefix_scan(b"t/users/").unwrap();
        let keys: Vec<_> = rows.into_iter().map(|(k, _)| k).collect();

        assert_eq!(keys, vec![b"t/users/a".to_vec(), b"t/users/b".to_vec()]);
    }

    #[test]
    fn test_atomic_batch_write() {
        let store = InMemoryKVStore::new();
        store.put(b"old", b"x").unwrap();

        store
            .atomic_batch_write(vec![
                BatchOperation::put(b"k1".to_vec(), b"v1".to_vec()),
                BatchOperation::put(b"k2".to_vec(), b"v2".to_vec()),
                BatchOperation::delete(b"old".to_vec()),
            ])
            .unwrap();

        assert_eq!(store.len(), 2);
        assert!(store.get(b"old").unwrap().is_none());
    }
}
