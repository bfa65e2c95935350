//! Error types for storage operations.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A bounded operation did not complete in time.
    #[error("{operation} timed out after {waited:?}")]
    Timeout {
        /// The operation that timed out.
        operation: &'static str,
        /// How long the caller waited.
        waited: Duration,
    },

    /// Stored data could not be interpreted.
    #[error("storage corrupted: {0}")]
    Corrupted(String),

    /// The store or pool is closed.
    #[error("storage is closed")]
    Closed,
}

impl StorageError {
    /// Returns true if this error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, StorageError::Timeout { .. })
    }
}
