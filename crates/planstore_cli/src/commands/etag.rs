//! Etag command implementation.

use super::read_json;
use planstore_core::etag::{canonical_bytes, etag_of_bytes};
use std::path::Path;

/// Runs the etag command.
pub fn run(file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let doc = read_json(file)?;
    let canonical = canonical_bytes(&doc)?;
    println!("{}", etag_of_bytes(&canonical).quoted());
    println!("Canonical size: {} bytes", canonical.len());
    Ok(())
}
