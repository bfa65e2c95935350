//! Error types for planstore core.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in lifecycle operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The identifier is missing, empty or does not match the path.
    #[error("bad request: {message}")]
    BadRequest {
        /// Description of the problem.
        message: String,
    },

    /// A create targeted an identifier that already exists.
    #[error("object already exists: {object_id}")]
    Conflict {
        /// The existing identifier.
        object_id: String,
    },

    /// The identifier is not present in the store.
    #[error("object not found: {object_id}")]
    NotFound {
        /// The missing identifier.
        object_id: String,
    },

    /// The caller's precondition no longer holds.
    #[error("precondition failed for {object_id}: resource has been modified")]
    PreconditionFailed {
        /// The identifier whose state changed.
        object_id: String,
    },

    /// A stored value is not a valid JSON document.
    #[error("stored object {object_id} is corrupted: {message}")]
    Corrupted {
        /// The affected identifier.
        object_id: String,
        /// Description of the corruption.
        message: String,
    },

    /// Storage substrate error.
    #[error("storage error: {0}")]
    Storage(#[from] planstore_storage::StorageError),

    /// JSON serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    /// Creates a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        CoreError::BadRequest {
            message: message.into(),
        }
    }

    /// Returns true if the caller caused this error.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            CoreError::BadRequest { .. }
                | CoreError::Conflict { .. }
                | CoreError::NotFound { .. }
                | CoreError::PreconditionFailed { .. }
        )
    }

    /// Returns true if this is a store or infrastructure failure.
    pub fn is_server_error(&self) -> bool {
        !self.is_client_error()
    }
}
