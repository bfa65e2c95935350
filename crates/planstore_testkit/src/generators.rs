//! Property-based test generators using proptest.
//!
//! Provides strategies for JSON documents, plan documents that carry an
//! `objectId`, and patches.

use proptest::prelude::*;
use serde_json::{json, Map, Value};

/// Strategy for generating valid object IDs.
pub fn object_id_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9][a-zA-Z0-9_-]{0,23}").expect("Invalid regex")
}

/// Strategy for JSON scalars (no floats, so equality is exact).
pub fn json_leaf_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        prop::string::string_regex("[ -~]{0,12}")
            .expect("Invalid regex")
            .prop_map(Value::String),
    ]
}

/// Strategy for arbitrary JSON values nested up to `depth` levels.
pub fn json_value_strategy(depth: u32) -> impl Strategy<Value = Value> {
    json_leaf_strategy().prop_recursive(depth, 64, 5, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..5).prop_map(Value::Array),
            json_map(inner).prop_map(Value::Object),
        ]
    })
}

/// Strategy for JSON objects (valid patch bodies).
pub fn json_object_strategy(depth: u32) -> impl Strategy<Value = Value> {
    json_map(json_value_strategy(depth)).prop_map(Value::Object)
}

/// Strategy for plan documents: objects whose `objectId` is `object_id`.
pub fn plan_document_strategy(object_id: String) -> impl Strategy<Value = Value> {
    json_object_strategy(3).prop_map(move |mut doc| {
        if let Value::Object(map) = &mut doc {
            map.insert("objectId".to_string(), Value::String(object_id.clone()));
        }
        doc
    })
}

fn json_map<S>(values: S) -> impl Strategy<Value = Map<String, Value>>
where
    S: Strategy<Value = Value>,
{
    prop::collection::btree_map(
        prop::string::string_regex("[a-zA-Z_][a-zA-Z0-9_]{0,7}").expect("Invalid regex"),
        values,
        0..5,
    )
    .prop_map(|entries| entries.into_iter().collect())
}
