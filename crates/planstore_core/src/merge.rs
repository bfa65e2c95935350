//! Recursive deep merge for partial updates.
//!
//! For every key in the patch:
//! - object into object merges key by key, recursively
//! - anything else replaces the existing value wholesale, arrays included
//! - `null` is stored as `null`; it does not remove the key
//!
//! Keys present only in the existing document are kept.

use crate::error::{CoreError, CoreResult};
use crate::types::{ObjectId, OBJECT_ID_FIELD};
use serde_json::Value;

/// Merges `patch` into `existing` in place.
///
/// If either side is not an object, `existing` becomes a copy of `patch`.
pub fn deep_merge(existing: &mut Value, patch: &Value) {
    match (existing, patch) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                match target.get_mut(key) {
                    Some(current) if current.is_object() && value.is_object() => {
                        deep_merge(current, value)
                    }
                    _ => {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (existing, patch) => *existing = patch.clone(),
    }
}

/// Applies a partial update to a stored document.
///
/// The result's top-level `objectId` is forced to `object_id`, whatever
/// the patch says.
///
/// # Errors
///
/// Returns [`CoreError::BadRequest`] if either document is not a JSON
/// object.
pub fn merge_patch(mut existing: Value, patch: &Value, object_id: &ObjectId) -> CoreResult<Value> {
    if !patch.is_object() {
        return Err(CoreError::bad_request("patch body must be a JSON object"));
    }
    if !existing.is_object() {
        return Err(CoreError::Corrupted {
            object_id: object_id.to_string(),
            message: "stored document is not a JSON object".into(),
        });
    }

    deep_merge(&mut existing, patch);
    if let Value::Object(map) = &mut existing {
        map.insert(
            OBJECT_ID_FIELD.to_string(),
            Value::String(object_id.to_string()),
        );
    }
    Ok(existing)
}
