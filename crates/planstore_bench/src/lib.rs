//! Benchmark utilities.

use serde_json::{json, Map, Value};

/// Generates a plan document with `services` linked plan services.
pub fn plan_document(object_id: &str, services: usize) -> Value {
    let linked: Vec<Value> = (0..services)
        .map(|i| {
            json!({
                "objectId": format!("{object_id}-svc-{i}"),
                "objectType": "planservice",
                "linkedService": {
                    "objectId": format!("{object_id}-svc-{i}-ls"),
                    "objectType": "service",
                    "name": format!("service {i}")
                },
                "planserviceCostShares": {"deductible": i, "copay": i * 2}
            })
        })
        .collect();

    json!({
        "objectId": object_id,
        "objectType": "plan",
        "planType": "inNetwork",
        "planCostShares": {"deductible": 2000, "copay": 23},
        "linkedPlanServices": linked
    })
}

/// Generates a nested object `depth` levels deep with `width` keys per level.
pub fn nested_object(depth: usize, width: usize) -> Value {
    if depth == 0 {
        return json!("leaf");
    }
    let map: Map<String, Value> = (0..width)
        .map(|i| (format!("key_{}", i), nested_object(depth - 1, width)))
        .collect();
    Value::Object(map)
}
