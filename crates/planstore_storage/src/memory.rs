//! In-memory key-value store.

use crate::backend::{CasOutcome, Connect, KvStore};
use crate::error::{StorageError, StorageResult};
use crate::DEFAULT_OPERATION_TIMEOUT;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// An in-memory key-value store.
///
/// Clones share the same underlying map, so a clone behaves like a second
/// connection to the same store. This store is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral deployments that don't need persistence
///
/// # Timeouts
///
/// Every lock acquisition waits at most the configured operation timeout
/// and fails with [`StorageError::Timeout`] otherwise.
///
/// # Example
///
/// ```rust
/// use planstore_storage::{InMemoryStore, KvStore};
///
/// let store = InMemoryStore::new();
/// store.set("plan-1", b"{}").unwrap();
/// assert!(store.delete("plan-1").unwrap());
/// assert!(!store.delete("plan-1").unwrap());
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    data: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    timeout: Duration,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_OPERATION_TIMEOUT)
    }

    /// Creates a new empty store with the given operation timeout.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
            timeout,
        }
    }

    /// Returns the number of stored keys.
    ///
    /// Useful for testing and debugging.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every key.
    pub fn clear(&self) {
        self.data.write().clear();
    }

    fn read(
        &self,
        operation: &'static str,
    ) -> StorageResult<RwLockReadGuard<'_, HashMap<String, Vec<u8>>>> {
        self.data
            .try_read_for(self.timeout)
            .ok_or(StorageError::Timeout {
                operation,
                waited: self.timeout,
            })
    }

    fn write(
        &self,
        operation: &'static str,
    ) -> StorageResult<RwLockWriteGuard<'_, HashMap<String, Vec<u8>>>> {
        self.data
            .try_write_for(self.timeout)
            .ok_or(StorageError::Timeout {
                operation,
                waited: self.timeout,
            })
    }
}

impl KvStore for InMemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.read("get")?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        self.write("set")?.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        Ok(self.write("delete")?.remove(key).is_some())
    }

    fn set_if_absent(&self, key: &str, value: &[u8]) -> StorageResult<bool> {
        let mut data = self.write("set_if_absent")?;
        if data.contains_key(key) {
            return Ok(false);
        }
        data.insert(key.to_string(), value.to_vec());
        Ok(true)
    }

    fn compare_and_swap(
        &self,
        key: &str,
        expected: &[u8],
        new: &[u8],
    ) -> StorageResult<CasOutcome> {
        let mut data = self.write("compare_and_swap")?;
        match data.get_mut(key) {
            None => Ok(CasOutcome::Missing),
            Some(current) if current.as_slice() != expected => Ok(CasOutcome::Mismatch),
            Some(current) => {
                *current = new.to_vec();
                Ok(CasOutcome::Swapped)
            }
        }
    }
}

impl Connect for InMemoryStore {
    type Connection = InMemoryStore;

    fn with_operation_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    fn connect(&self) -> StorageResult<Self::Connection> {
        Ok(self.clone())
    }
}
