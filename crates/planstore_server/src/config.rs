//! Server configuration.

use crate::auth::AuthConfig;
use crate::error::{ServerError, ServerResult};
use planstore_storage::PoolConfig;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the plan server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Path prefix of the plan collection.
    pub route_prefix: String,
    /// Largest accepted request body.
    pub max_body_bytes: usize,
    /// Whether mutations must carry a bearer token.
    pub require_auth: bool,
    /// Token settings (if auth enabled).
    pub auth: Option<AuthConfig>,
    /// Store connection pool settings.
    pub pool: PoolConfig,
    /// Bound on a single store operation and on pool acquisition.
    pub store_timeout: Duration,
    /// JSON Schema file for documents; `None` requires only `objectId`.
    pub schema_path: Option<PathBuf>,
}

impl ServerConfig {
    /// Creates a configuration serving under `route_prefix`.
    pub fn new(route_prefix: impl Into<String>) -> Self {
        Self {
            route_prefix: normalize_prefix(route_prefix.into()),
            max_body_bytes: 1024 * 1024,
            require_auth: false,
            auth: None,
            pool: PoolConfig::default(),
            store_timeout: planstore_storage::DEFAULT_OPERATION_TIMEOUT,
            schema_path: None,
        }
    }

    /// Reads configuration from `PLANSTORE_*` environment variables,
    /// falling back to defaults for unset ones.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed.
    pub fn from_env() -> ServerResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`ServerConfig::from_env`], reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> ServerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup("PLANSTORE_ROUTE_PREFIX") {
            Some(prefix) => Self::new(prefix),
            None => Self::default(),
        };

        if let Some(bytes) = parse_var(&lookup, "PLANSTORE_MAX_BODY_BYTES")? {
            config = config.with_max_body_bytes(bytes);
        }
        if let Some(size) = parse_var(&lookup, "PLANSTORE_POOL_SIZE")? {
            config = config.with_pool(PoolConfig::new(size));
        }
        if let Some(millis) = parse_var(&lookup, "PLANSTORE_STORE_TIMEOUT_MS")? {
            config = config.with_store_timeout(Duration::from_millis(millis));
        }
        if let Some(secret) = lookup("PLANSTORE_AUTH_SECRET") {
            config = config.with_auth(secret.into_bytes());
        }
        if let Some(secs) = parse_var(&lookup, "PLANSTORE_TOKEN_EXPIRY_SECS")? {
            config = config.with_token_expiry(Duration::from_secs(secs));
        }
        if let Some(path) = lookup("PLANSTORE_SCHEMA_PATH") {
            config = config.with_schema_path(path);
        }

        Ok(config)
    }

    /// Sets the maximum request body size.
    pub fn with_max_body_bytes(mut self, max: usize) -> Self {
        self.max_body_bytes = max;
        self
    }

    /// Sets the store pool configuration. The pool's acquire timeout
    /// follows the store timeout.
    pub fn with_pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool.with_acquire_timeout(self.store_timeout);
        self
    }

    /// Sets the bound on store operations and pool acquisition.
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self.pool = self.pool.with_acquire_timeout(timeout);
        self
    }

    /// Validates documents against the JSON Schema at `path`.
    pub fn with_schema_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.schema_path = Some(path.into());
        self
    }

    /// Enables authentication with the given secret.
    pub fn with_auth(mut self, secret: Vec<u8>) -> Self {
        self.require_auth = true;
        self.auth = Some(AuthConfig::new(secret));
        self
    }

    /// Sets the token lifetime. Has no effect unless auth is enabled.
    pub fn with_token_expiry(mut self, expiry: Duration) -> Self {
        self.auth = self.auth.map(|auth| auth.with_expiry(expiry));
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new("/v1/plan")
    }
}

fn normalize_prefix(prefix: String) -> String {
    let trimmed = prefix.trim_end_matches('/');
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> ServerResult<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ServerError::Config(format!("invalid value for {key}: {raw:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.route_prefix, "/v1/plan");
        assert_eq!(config.max_body_bytes, 1024 * 1024);
        assert!(!config.require_auth);
        assert!(config.auth.is_none());
    }

    #[test]
    fn config_builder() {
        let config = ServerConfig::new("api/plans/")
            .with_max_body_bytes(512)
            .with_store_timeout(Duration::from_millis(250))
            .with_auth(vec![1, 2, 3, 4])
            .with_token_expiry(Duration::from_secs(60));

        assert_eq!(config.route_prefix, "/api/plans");
        assert_eq!(config.max_body_bytes, 512);
        assert_eq!(config.pool.acquire_timeout, Duration::from_millis(250));
        assert!(config.require_auth);
        let auth = config.auth.unwrap();
        assert_eq!(auth.secret.as_slice(), &[1, 2, 3, 4]);
        assert_eq!(auth.token_expiry, Duration::from_secs(60));
    }

    #[test]
    fn config_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("PLANSTORE_ROUTE_PREFIX", "/v2/plan"),
            ("PLANSTORE_POOL_SIZE", "3"),
            ("PLANSTORE_STORE_TIMEOUT_MS", "100"),
            ("PLANSTORE_AUTH_SECRET", "s3cret"),
            ("PLANSTORE_TOKEN_EXPIRY_SECS", "30"),
            ("PLANSTORE_SCHEMA_PATH", "/etc/planstore/plan.schema.json"),
        ]
        .into_iter()
        .collect();

        let config =
            ServerConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config.route_prefix, "/v2/plan");
        assert_eq!(config.pool.max_size, 3);
        assert_eq!(config.pool.acquire_timeout, Duration::from_millis(100));
        assert_eq!(config.store_timeout, Duration::from_millis(100));
        assert_eq!(
            config.schema_path,
            Some(PathBuf::from("/etc/planstore/plan.schema.json"))
        );
        assert!(config.require_auth);
        assert_eq!(
            config.auth.unwrap().token_expiry,
            Duration::from_secs(30)
        );
    }

    #[test]
    fn config_from_lookup_rejects_garbage() {
        let result = ServerConfig::from_lookup(|key| {
            (key == "PLANSTORE_POOL_SIZE").then(|| "many".to_string())
        });
        assert!(matches!(result, Err(ServerError::Config(_))));
    }
}
