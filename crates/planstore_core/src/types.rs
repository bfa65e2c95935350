//! Identifier, etag and record types.

use crate::error::{CoreError, CoreResult};
use serde_json::Value;
use std::fmt;

/// Name of the payload field that carries the object's identifier.
pub const OBJECT_ID_FIELD: &str = "objectId";

/// Caller-supplied identifier of a plan object.
///
/// Object IDs are:
/// - Non-empty strings
/// - Immutable once the object is created
/// - The key of the object in the store
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(String);

impl ObjectId {
    /// Creates an object ID, rejecting the empty string.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::BadRequest`] if `id` is empty.
    pub fn new(id: impl Into<String>) -> CoreResult<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(CoreError::bad_request("objectId must not be empty"));
        }
        Ok(Self(id))
    }

    /// Reads the identifier carried in a payload's `objectId` field.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::BadRequest`] if the payload is not an object,
    /// has no `objectId`, or the field is not a non-empty string.
    pub fn from_payload(payload: &Value) -> CoreResult<Self> {
        match payload.get(OBJECT_ID_FIELD) {
            Some(Value::String(id)) => Self::new(id.clone()),
            Some(_) => Err(CoreError::bad_request("objectId must be a string")),
            None => Err(CoreError::bad_request("objectId is required")),
        }
    }

    /// Returns the identifier as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Content fingerprint of a stored payload.
///
/// Holds the lowercase hex digest without surrounding quotes.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Etag(String);

impl Etag {
    /// Wraps an already computed hex digest.
    #[must_use]
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// Returns the bare digest.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the digest wrapped in double quotes, as sent in an `ETag`
    /// header.
    #[must_use]
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }
}

impl fmt::Debug for Etag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Etag({})", self.0)
    }
}

impl fmt::Display for Etag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A plan object as returned by the lifecycle controller.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanRecord {
    /// The store key.
    pub object_id: ObjectId,
    /// The stored document.
    pub payload: Value,
    /// Etag of the stored document.
    pub etag: Etag,
}
