//! Main plan server.

use crate::auth::{AnonymousVerifier, IdentityVerifier, TokenValidator};
use crate::config::ServerConfig;
use crate::handler::RequestHandler;
use crate::http::{Request, Response};
use crate::error::ServerResult;
use crate::schema::{PlanSchema, SchemaValidator};
use planstore_core::PlanController;
use planstore_storage::{Connect, StorePool};
use std::sync::Arc;
use tracing::{error, info_span, warn};
use uuid::Uuid;

/// The plan server.
///
/// Owns a long-lived store pool and maps requests to responses. Each
/// request runs in its own `tracing` span tagged with a fresh request id,
/// which is echoed back in the `X-Request-Id` header.
///
/// # Example
///
/// ```
/// use planstore_server::{Method, PlanServer, Request, ServerConfig};
/// use planstore_storage::InMemoryStore;
/// use serde_json::json;
///
/// let server = PlanServer::new(ServerConfig::default(), InMemoryStore::new()).unwrap();
/// let response = server.handle(
///     Request::new(Method::Post, "/v1/plan").with_json(&json!({"objectId": "a"})),
/// );
/// assert_eq!(response.status, 201);
/// assert!(response.header("ETag").is_some());
/// ```
pub struct PlanServer<C: Connect> {
    handler: RequestHandler<C>,
}

impl<C: Connect> PlanServer<C> {
    /// Creates a server over `connector`.
    ///
    /// Uses HMAC tokens when the config enables auth, the schema at
    /// `config.schema_path` (or the minimal [`PlanSchema`]), and a pool
    /// sized by the config.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`](crate::ServerError::Config) if the
    /// schema cannot be loaded.
    pub fn new(config: ServerConfig, connector: C) -> ServerResult<Self> {
        let verifier: Arc<dyn IdentityVerifier> = match (&config.auth, config.require_auth) {
            (Some(auth), true) => Arc::new(TokenValidator::new(auth.clone())),
            _ => Arc::new(AnonymousVerifier),
        };
        let schema = Arc::new(PlanSchema::load(config.schema_path.as_deref())?);
        Ok(Self::with_parts(config, connector, verifier, schema))
    }

    /// Creates a server with explicit identity and schema gates.
    ///
    /// Store operations are bounded by `config.store_timeout`.
    pub fn with_parts(
        config: ServerConfig,
        connector: C,
        verifier: Arc<dyn IdentityVerifier>,
        schema: Arc<dyn SchemaValidator>,
    ) -> Self {
        let connector = connector.with_operation_timeout(config.store_timeout);
        let pool = Arc::new(StorePool::new(connector, config.pool.clone()));
        let controller = PlanController::new(pool);
        let handler = RequestHandler::new(config, controller, verifier, schema);
        Self { handler }
    }

    /// Returns the lifecycle controller.
    pub fn controller(&self) -> &PlanController<C> {
        self.handler.controller()
    }

    /// Handles a request, rendering any error as a JSON error response.
    pub fn handle(&self, request: Request) -> Response {
        let request_id = Uuid::new_v4();
        let span = info_span!(
            "request",
            %request_id,
            method = %request.method,
            path = %request.route_path(),
        );
        let _enter = span.enter();

        let response = match self.handler.handle(&request) {
            Ok(response) => response,
            Err(e) if e.is_server_error() => {
                error!(error = %e, "request failed");
                e.into_response()
            }
            Err(e) => {
                warn!(status = e.status_code(), error = %e, "request rejected");
                e.into_response()
            }
        };

        response.with_header("X-Request-Id", request_id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Method;
    use parking_lot::Mutex;
    use planstore_storage::{CasOutcome, InMemoryStore, KvStore, StorageError, StorageResult};
    use serde_json::json;
    use std::time::{Duration, Instant};

    #[test]
    fn server_lifecycle() {
        let server = PlanServer::new(ServerConfig::default(), InMemoryStore::new()).unwrap();
        let response = server.handle(Request::new(Method::Get, "/v1/plan/none"));
        assert_eq!(response.status, 404);
        assert_eq!(response.json_body().unwrap()["error"], "not_found");
        assert!(response.header("X-Request-Id").is_some());
    }

    #[test]
    fn auth_enabled_uses_tokens() {
        let secret = b"server-secret".to_vec();
        let config = ServerConfig::default().with_auth(secret.clone());
        let server = PlanServer::new(config, InMemoryStore::new()).unwrap();
        let doc = json!({"objectId": "a"});

        let response = server.handle(Request::new(Method::Post, "/v1/plan").with_json(&doc));
        assert_eq!(response.status, 401);
        assert_eq!(response.json_body().unwrap()["error"], "unauthorized");

        let token = TokenValidator::new(crate::auth::AuthConfig::new(secret))
            .issue_token("alice")
            .unwrap();
        let response = server.handle(
            Request::new(Method::Post, "/v1/plan")
                .with_json(&doc)
                .with_bearer(&token),
        );
        assert_eq!(response.status, 201);
    }

    #[test]
    fn storage_failure_is_internal_error() {
        let server = PlanServer::new(ServerConfig::default(), InMemoryStore::new()).unwrap();
        server.controller().pool().close();

        let response = server.handle(Request::new(Method::Get, "/v1/plan/a"));
        assert_eq!(response.status, 500);
        assert_eq!(response.json_body().unwrap()["error"], "internal_error");
    }

    /// Store whose operations wait on a shared gate, bounded by the
    /// configured operation timeout.
    #[derive(Clone)]
    struct GatedStore {
        inner: InMemoryStore,
        gate: Arc<Mutex<()>>,
        timeout: Duration,
    }

    impl GatedStore {
        fn pass(&self, operation: &'static str) -> StorageResult<()> {
            self.gate
                .try_lock_for(self.timeout)
                .map(drop)
                .ok_or(StorageError::Timeout {
                    operation,
                    waited: self.timeout,
                })
        }
    }

    impl KvStore for GatedStore {
        fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
            self.pass("get")?;
            self.inner.get(key)
        }
        fn set(&self, key: &str, value: &[u8]) -> StorageResult<()> {
            self.pass("set")?;
            self.inner.set(key, value)
        }
        fn set_if_absent(&self, key: &str, value: &[u8]) -> StorageResult<bool> {
            self.pass("set_if_absent")?;
            self.inner.set_if_absent(key, value)
        }
        fn compare_and_swap(
            &self,
            key: &str,
            expected: &[u8],
            value: &[u8],
        ) -> StorageResult<CasOutcome> {
            self.pass("compare_and_swap")?;
            self.inner.compare_and_swap(key, expected, value)
        }
        fn delete(&self, key: &str) -> StorageResult<bool> {
            self.pass("delete")?;
            self.inner.delete(key)
        }
    }

    impl Connect for GatedStore {
        type Connection = GatedStore;
        fn with_operation_timeout(self, timeout: Duration) -> Self {
            Self { timeout, ..self }
        }
        fn connect(&self) -> StorageResult<Self> {
            Ok(self.clone())
        }
    }

    #[test]
    fn configured_store_timeout_bounds_blocked_operations() {
        let gate = Arc::new(Mutex::new(()));
        let store = GatedStore {
            inner: InMemoryStore::new(),
            gate: Arc::clone(&gate),
            timeout: Duration::from_secs(30),
        };
        let config = ServerConfig::default().with_store_timeout(Duration::from_millis(50));
        let server = PlanServer::new(config, store).unwrap();

        let _held = gate.lock();
        let start = Instant::now();
        let response = server.handle(Request::new(Method::Get, "/v1/plan/a"));
        assert_eq!(response.status, 500);
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn schema_path_from_config_is_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.schema.json");
        std::fs::write(&path, r#"{"type": "object", "required": ["objectId", "planType"]}"#)
            .unwrap();
        let config = ServerConfig::default().with_schema_path(&path);
        let server = PlanServer::new(config, InMemoryStore::new()).unwrap();

        let response = server.handle(
            Request::new(Method::Post, "/v1/plan").with_json(&json!({"objectId": "a"})),
        );
        assert_eq!(response.status, 400);
        let response = server.handle(
            Request::new(Method::Post, "/v1/plan")
                .with_json(&json!({"objectId": "a", "planType": "inNetwork"})),
        );
        assert_eq!(response.status, 201);
    }

    #[test]
    fn unreadable_schema_fails_construction() {
        let config = ServerConfig::default().with_schema_path("/nonexistent/plan.schema.json");
        let result = PlanServer::new(config, InMemoryStore::new());
        assert!(matches!(result, Err(crate::ServerError::Config(_))));
    }
}
