//! Content hashing.
//!
//! A document's canonical form is its compact JSON encoding with every
//! object's keys in ascending order. The etag is the lowercase hex SHA-256
//! of those bytes, so equal canonical bytes always give equal etags, across
//! calls and across process restarts.
//!
//! Numbers are not normalized: `1` and `1.0` encode differently and
//! therefore hash differently.

use crate::error::CoreResult;
use crate::types::Etag;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Serializes `doc` in canonical form.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn canonical_bytes(doc: &Value) -> CoreResult<Vec<u8>> {
    Ok(serde_json::to_vec(&sorted(doc))?)
}

/// Computes the etag of already canonical bytes.
#[must_use]
pub fn etag_of_bytes(bytes: &[u8]) -> Etag {
    let digest = Sha256::digest(bytes);
    Etag::from_hex(digest.iter().map(|b| format!("{:02x}", b)).collect::<String>())
}

/// Computes the etag of a document.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn etag_of(doc: &Value) -> CoreResult<Etag> {
    Ok(etag_of_bytes(&canonical_bytes(doc)?))
}

// Rebuilds every object with keys inserted in order, so the encoding is
// sorted whether or not serde_json preserves insertion order.
fn sorted(doc: &Value) -> Value {
    match doc {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let mut out = Map::with_capacity(entries.len());
            for (key, value) in entries {
                out.insert(key.clone(), sorted(value));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}
