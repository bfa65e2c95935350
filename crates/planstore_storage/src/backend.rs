//! Key-value store trait definition.

use crate::error::StorageResult;
use std::time::Duration;

/// Result of a [`KvStore::compare_and_swap`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    /// The stored value matched and was replaced.
    Swapped,
    /// The stored value differed; nothing was written.
    Mismatch,
    /// No value was stored under the key; nothing was written.
    Missing,
}

/// A key-value store holding opaque byte values.
///
/// # Invariants
///
/// - `get` returns exactly the bytes of the last successful write to the key
/// - `set_if_absent` and `compare_and_swap` are atomic with respect to every
///   other mutating call on the same store: for a given prior state at most
///   one of several concurrent conditional writes succeeds
/// - A failed call leaves the stored value unchanged
/// - Stores must be `Send + Sync` for concurrent access
///
/// # Implementors
///
/// - [`super::InMemoryStore`] - For testing
/// - [`super::FileStore`] - For persistent storage
pub trait KvStore: Send + Sync {
    /// Returns the value stored under `key`, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read in time.
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Stores `value` under `key` unconditionally.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails; the previous value is retained.
    fn set(&self, key: &str, value: &[u8]) -> StorageResult<()>;

    /// Removes `key`. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the removal fails.
    fn delete(&self, key: &str) -> StorageResult<bool>;

    /// Stores `value` under `key` only if no value is present.
    ///
    /// Returns `true` if the value was written, `false` if the key was
    /// already present.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn set_if_absent(&self, key: &str, value: &[u8]) -> StorageResult<bool>;

    /// Replaces the value under `key` with `new` only if it currently
    /// equals `expected` byte for byte.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn compare_and_swap(&self, key: &str, expected: &[u8], new: &[u8])
        -> StorageResult<CasOutcome>;
}

/// A source of store connections.
///
/// A pool calls `connect` lazily, up to its configured size, and hands the
/// resulting connections out to one caller at a time.
///
/// Connections are handles: a clone must talk to the same store as the
/// original.
pub trait Connect: Send + Sync {
    /// The connection type produced.
    type Connection: KvStore + Clone;

    /// Returns this connector with every operation of the connections it
    /// produces bounded by `timeout`.
    #[must_use]
    fn with_operation_timeout(self, timeout: Duration) -> Self
    where
        Self: Sized;

    /// Opens a new connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    fn connect(&self) -> StorageResult<Self::Connection>;
}
