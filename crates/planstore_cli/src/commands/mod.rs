//! CLI command implementations.

pub mod etag;
pub mod plan;
pub mod token;

use serde_json::Value;
use std::path::Path;

/// Reads and parses a JSON file.
pub fn read_json(file: &Path) -> Result<Value, Box<dyn std::error::Error>> {
    let bytes = std::fs::read(file).map_err(|e| format!("Failed to read {:?}: {}", file, e))?;
    let value = serde_json::from_slice(&bytes)
        .map_err(|e| format!("Malformed JSON in {:?}: {}", file, e))?;
    Ok(value)
}
