//! Error types for the server.

use crate::http::{status, Response};
use planstore_core::CoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors surfaced to callers of the HTTP surface.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Missing, malformed, invalid or expired credential.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Body fails structural validation.
    #[error("schema validation failed: {0}")]
    SchemaInvalid(String),

    /// Malformed request, or missing or mismatched `objectId`.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Create on an existing key.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Operation on an absent key.
    #[error("not found: {0}")]
    NotFound(String),

    /// Stale `If-Match`.
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    /// Store or infrastructure failure.
    #[error("internal error: {0}")]
    Internal(String),

    /// Invalid server configuration or schema.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ServerError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ServerError::Unauthorized(_) => status::UNAUTHORIZED,
            ServerError::SchemaInvalid(_) | ServerError::BadRequest(_) => status::BAD_REQUEST,
            ServerError::Conflict(_) => status::CONFLICT,
            ServerError::NotFound(_) => status::NOT_FOUND,
            ServerError::PreconditionFailed(_) => status::PRECONDITION_FAILED,
            ServerError::Internal(_) | ServerError::Config(_) => status::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a short machine-readable reason.
    pub fn reason(&self) -> &'static str {
        match self {
            ServerError::Unauthorized(_) => "unauthorized",
            ServerError::SchemaInvalid(_) => "schema_invalid",
            ServerError::BadRequest(_) => "bad_request",
            ServerError::Conflict(_) => "conflict",
            ServerError::NotFound(_) => "not_found",
            ServerError::PreconditionFailed(_) => "precondition_failed",
            ServerError::Internal(_) => "internal_error",
            ServerError::Config(_) => "config_error",
        }
    }

    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        !self.is_server_error()
    }

    /// Returns true if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        matches!(self, ServerError::Internal(_) | ServerError::Config(_))
    }

    /// Converts the error into a JSON error response.
    ///
    /// Internal details are not sent to the caller.
    pub fn into_response(self) -> Response {
        let message = match &self {
            ServerError::Internal(_) | ServerError::Config(_) => {
                "Internal Server Error".to_string()
            }
            ServerError::Unauthorized(m)
            | ServerError::SchemaInvalid(m)
            | ServerError::BadRequest(m)
            | ServerError::Conflict(m)
            | ServerError::NotFound(m)
            | ServerError::PreconditionFailed(m) => m.clone(),
        };
        let body = ErrorBody {
            error: self.reason().to_string(),
            message,
        };
        match serde_json::to_value(&body) {
            Ok(value) => Response::json(self.status_code(), &value),
            Err(_) => Response::text(self.status_code(), self.reason()),
        }
    }
}

/// JSON body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable reason, see [`ServerError::reason`].
    pub error: String,
    /// Human-readable detail.
    pub message: String,
}

impl From<CoreError> for ServerError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::BadRequest { message } => ServerError::BadRequest(message),
            e @ CoreError::Conflict { .. } => ServerError::Conflict(e.to_string()),
            e @ CoreError::NotFound { .. } => ServerError::NotFound(e.to_string()),
            e @ CoreError::PreconditionFailed { .. } => {
                ServerError::PreconditionFailed(e.to_string())
            }
            e @ (CoreError::Corrupted { .. }
            | CoreError::Storage(_)
            | CoreError::Serialization(_)) => ServerError::Internal(e.to_string()),
        }
    }
}
