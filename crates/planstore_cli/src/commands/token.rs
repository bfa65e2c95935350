//! Token command implementation.

use planstore_server::{AuthConfig, TokenValidator};
use std::time::Duration;

/// Runs the issue-token command.
pub fn run(subject: &str, secret: String, expiry_secs: u64) -> Result<(), Box<dyn std::error::Error>> {
    if secret.is_empty() {
        return Err("Secret must not be empty".into());
    }
    let config = AuthConfig::new(secret.into_bytes()).with_expiry(Duration::from_secs(expiry_secs));
    let token = TokenValidator::new(config).issue_token(subject)?;
    println!("{}", token);
    Ok(())
}
