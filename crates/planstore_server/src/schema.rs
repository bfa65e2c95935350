//! Structural validation of request bodies.
//!
//! Documents are checked against a compiled JSON Schema (Draft 7). The
//! default schema only requires a non-empty string `objectId`; the
//! insurance plan schema ships embedded, and any other schema can be
//! loaded from a file.

use crate::error::{ServerError, ServerResult};
use jsonschema::{Draft, JSONSchema};
use serde_json::{json, Value};
use std::fmt;
use std::path::Path;
use tracing::debug;

const INSURANCE_PLAN_SCHEMA: &str = include_str!("../schemas/insurance_plan.schema.json");

/// Pass/fail gate applied to request bodies before any mutation.
pub trait SchemaValidator: Send + Sync {
    /// Validates a full document (create and replace).
    fn validate_document(&self, doc: &Value) -> ServerResult<()>;

    /// Validates a partial update. By default the patch only has to be a
    /// JSON object.
    fn validate_patch(&self, patch: &Value) -> ServerResult<()> {
        if patch.is_object() {
            Ok(())
        } else {
            Err(ServerError::SchemaInvalid(
                "patch body must be a JSON object".into(),
            ))
        }
    }
}

/// Accepts every document.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl SchemaValidator for AcceptAll {
    fn validate_document(&self, _doc: &Value) -> ServerResult<()> {
        Ok(())
    }
}

/// JSON Schema validator for plan documents.
///
/// # Example
///
/// ```
/// use planstore_server::{PlanSchema, SchemaValidator};
/// use serde_json::json;
///
/// let schema = PlanSchema::new().unwrap();
/// assert!(schema.validate_document(&json!({"objectId": "a"})).is_ok());
/// assert!(schema.validate_document(&json!({"objectId": ""})).is_err());
/// ```
pub struct PlanSchema {
    schema: Value,
    compiled: JSONSchema,
}

impl PlanSchema {
    /// Creates a schema that only requires a non-empty string `objectId`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] if the schema fails to compile.
    pub fn new() -> ServerResult<Self> {
        Self::from_value(Self::default_schema())
    }

    /// Schema for the insurance plan documents the service was built for.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] if the embedded schema fails to
    /// parse or compile.
    pub fn insurance_plan() -> ServerResult<Self> {
        let schema = serde_json::from_str(INSURANCE_PLAN_SCHEMA)
            .map_err(|e| ServerError::Config(format!("embedded plan schema: {e}")))?;
        Self::from_value(schema)
    }

    /// Loads a schema from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] if the file cannot be read, is not
    /// JSON, or is not a valid Draft 7 schema.
    pub fn from_file(path: &Path) -> ServerResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ServerError::Config(format!("failed to read schema {}: {e}", path.display()))
        })?;
        let schema = serde_json::from_str(&content).map_err(|e| {
            ServerError::Config(format!("malformed schema {}: {e}", path.display()))
        })?;
        Self::from_value(schema)
    }

    /// Loads the schema at `path`, or the default schema when `None`.
    ///
    /// # Errors
    ///
    /// See [`PlanSchema::from_file`].
    pub fn load(path: Option<&Path>) -> ServerResult<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Self::new(),
        }
    }

    /// Compiles `schema` as a Draft 7 JSON Schema.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] if the schema fails to compile.
    pub fn from_value(schema: Value) -> ServerResult<Self> {
        let compiled = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&schema)
            .map_err(|e| ServerError::Config(format!("failed to compile schema: {e}")))?;
        Ok(Self { schema, compiled })
    }

    /// Returns the schema document.
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    fn default_schema() -> Value {
        json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "title": "Plan document",
            "type": "object",
            "properties": {
                "objectId": { "type": "string", "minLength": 1 }
            },
            "required": ["objectId"]
        })
    }
}

impl fmt::Debug for PlanSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlanSchema")
            .field("title", &self.schema.get("title"))
            .finish_non_exhaustive()
    }
}

impl SchemaValidator for PlanSchema {
    fn validate_document(&self, doc: &Value) -> ServerResult<()> {
        if let Err(errors) = self.compiled.validate(doc) {
            let problems: Vec<String> = errors
                .map(|e| {
                    let path = e.instance_path.to_string();
                    let at = if path.is_empty() { "/".to_string() } else { path };
                    format!("{e} at {at}")
                })
                .collect();
            return Err(ServerError::SchemaInvalid(problems.join("; ")));
        }

        debug!("schema validation passed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> Value {
        json!({
            "objectId": "12xvxc345ssdsds-508",
            "objectType": "plan",
            "_org": "example.com",
            "planType": "inNetwork",
            "creationDate": "12-12-2017",
            "planCostShares": {
                "objectId": "1234vxc2324sdf-501",
                "objectType": "membercostshare",
                "_org": "example.com",
                "deductible": 2000,
                "copay": 23
            },
            "linkedPlanServices": [
                {
                    "objectId": "27283xvx9asdff-504",
                    "objectType": "planservice",
                    "_org": "example.com",
                    "linkedService": {
                        "objectId": "1234520xvc30asdf-502",
                        "objectType": "service",
                        "_org": "example.com",
                        "name": "Yearly physical"
                    },
                    "planserviceCostShares": {
                        "objectId": "1234512xvc1314asdfs-503",
                        "objectType": "membercostshare",
                        "_org": "example.com",
                        "deductible": 10,
                        "copay": 0
                    }
                }
            ]
        })
    }

    #[test]
    fn default_schema_requires_object_id() {
        let schema = PlanSchema::new().unwrap();
        assert!(schema.validate_document(&json!({"objectId": "a"})).is_ok());
        assert!(schema.validate_document(&json!({"objectId": ""})).is_err());
        assert!(schema.validate_document(&json!({"objectId": 7})).is_err());
        assert!(schema.validate_document(&json!({"x": 1})).is_err());
        assert!(schema.validate_document(&json!([1, 2])).is_err());
    }

    #[test]
    fn insurance_plan_accepts_complete_plan() {
        let schema = PlanSchema::insurance_plan().unwrap();
        assert_eq!(schema.schema()["title"], "Insurance Plan");
        assert!(schema.validate_document(&plan()).is_ok());
    }

    #[test]
    fn insurance_plan_reports_nested_violations() {
        let schema = PlanSchema::insurance_plan().unwrap();
        let mut doc = plan();
        doc["planCostShares"]["copay"] = json!("free");
        doc["linkedPlanServices"][0]
            .as_object_mut()
            .unwrap()
            .remove("linkedService");

        let err = schema.validate_document(&doc).unwrap_err();
        assert!(matches!(err, ServerError::SchemaInvalid(_)));
        let message = err.to_string();
        assert!(message.contains("/planCostShares/copay"), "{message}");
        assert!(message.contains("linkedService"), "{message}");
    }

    #[test]
    fn insurance_plan_rejects_partial_document() {
        let schema = PlanSchema::insurance_plan().unwrap();
        let err = schema
            .validate_document(&json!({"objectId": "x", "objectType": "plan"}))
            .unwrap_err();
        assert!(err.to_string().contains("planCostShares"));
    }

    #[test]
    fn schema_loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tags.schema.json");
        std::fs::write(
            &path,
            r#"{"type": "object", "required": ["objectId", "tags"],
                "properties": {"tags": {"type": "array"}}}"#,
        )
        .unwrap();

        let schema = PlanSchema::load(Some(&path)).unwrap();
        assert!(schema
            .validate_document(&json!({"objectId": "a", "tags": []}))
            .is_ok());
        assert!(schema
            .validate_document(&json!({"objectId": "a", "tags": "x"}))
            .is_err());
    }

    #[test]
    fn invalid_schema_is_config_error() {
        let err = PlanSchema::from_value(json!({"type": 12})).unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
        assert!(err.is_server_error());

        let missing = PlanSchema::from_file(Path::new("/nonexistent/plan.schema.json"));
        assert!(matches!(missing, Err(ServerError::Config(_))));
    }

    #[test]
    fn patch_must_be_object() {
        let schema = PlanSchema::insurance_plan().unwrap();
        assert!(schema.validate_patch(&json!({"planType": "x"})).is_ok());
        assert!(matches!(
            schema.validate_patch(&json!("x")),
            Err(ServerError::SchemaInvalid(_))
        ));
    }

    #[test]
    fn accept_all() {
        assert!(AcceptAll.validate_document(&json!(null)).is_ok());
        assert!(AcceptAll.validate_patch(&json!(null)).is_err());
    }
}
