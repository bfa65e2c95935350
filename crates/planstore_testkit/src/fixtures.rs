//! Test fixtures and server helpers.
//!
//! Provides servers backed by throwaway stores, sample plan documents,
//! and shorthand for issuing the five plan requests.

use planstore_server::{
    AuthConfig, Method, PlanServer, Request, Response, ServerConfig, TokenValidator,
};
use planstore_storage::{Connect, FileStore, InMemoryStore};
use serde_json::{json, Value};
use std::ops::Deref;
use std::path::Path;
use tempfile::TempDir;

/// Secret used by [`TestServer::memory_with_auth`].
pub const TEST_SECRET: &[u8] = b"planstore-test-secret-0123456789";

/// A plan server with automatic cleanup of its store.
pub struct TestServer<C: Connect> {
    /// The server instance.
    pub server: PlanServer<C>,
    /// Bearer token attached to mutating requests, if auth is enabled.
    pub token: Option<String>,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: Option<TempDir>,
}

impl TestServer<InMemoryStore> {
    /// Creates a server over a fresh in-memory store, auth disabled.
    pub fn memory() -> Self {
        Self {
            server: PlanServer::new(ServerConfig::default(), InMemoryStore::new())
                .expect("Failed to create test server"),
            token: None,
            _temp_dir: None,
        }
    }

    /// Creates a server over a fresh in-memory store with HMAC auth
    /// enabled, holding a valid token for `alice`.
    pub fn memory_with_auth() -> Self {
        let config = ServerConfig::default().with_auth(TEST_SECRET.to_vec());
        let token = TokenValidator::new(AuthConfig::new(TEST_SECRET.to_vec()))
            .issue_token("alice")
            .expect("Failed to issue test token");
        Self {
            server: PlanServer::new(config, InMemoryStore::new())
                .expect("Failed to create test server"),
            token: Some(token),
            _temp_dir: None,
        }
    }
}

impl TestServer<FileStore> {
    /// Creates a server over a file store in a temporary directory.
    pub fn file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = FileStore::open(temp_dir.path()).expect("Failed to open file store");
        Self {
            server: PlanServer::new(ServerConfig::default(), store)
                .expect("Failed to create test server"),
            token: None,
            _temp_dir: Some(temp_dir),
        }
    }

    /// Returns the store directory.
    pub fn path(&self) -> Option<&Path> {
        self._temp_dir.as_ref().map(|d| d.path())
    }
}

impl<C: Connect> TestServer<C> {
    fn authorized(&self, request: Request) -> Request {
        match &self.token {
            Some(token) => request.with_bearer(token),
            None => request,
        }
    }

    /// `POST /v1/plan`
    pub fn create(&self, doc: &Value) -> Response {
        let request = self.authorized(Request::new(Method::Post, "/v1/plan").with_json(doc));
        self.server.handle(request)
    }

    /// `GET /v1/plan/{id}`
    pub fn get(&self, id: &str) -> Response {
        self.server.handle(Request::new(Method::Get, item_path(id)))
    }

    /// `GET /v1/plan/{id}` with `If-None-Match`.
    pub fn get_if_none_match(&self, id: &str, etag: &str) -> Response {
        self.server
            .handle(Request::new(Method::Get, item_path(id)).with_header("If-None-Match", etag))
    }

    /// `PUT /v1/plan/{id}`, optionally with `If-Match`.
    pub fn replace(&self, id: &str, doc: &Value, if_match: Option<&str>) -> Response {
        self.write(Method::Put, id, doc, if_match)
    }

    /// `PATCH /v1/plan/{id}`, optionally with `If-Match`.
    pub fn patch(&self, id: &str, doc: &Value, if_match: Option<&str>) -> Response {
        self.write(Method::Patch, id, doc, if_match)
    }

    /// `DELETE /v1/plan/{id}`
    pub fn delete(&self, id: &str) -> Response {
        let request = self.authorized(Request::new(Method::Delete, item_path(id)));
        self.server.handle(request)
    }

    fn write(&self, method: Method, id: &str, doc: &Value, if_match: Option<&str>) -> Response {
        let mut request = Request::new(method, item_path(id)).with_json(doc);
        if let Some(etag) = if_match {
            request = request.with_header("If-Match", etag);
        }
        self.server.handle(self.authorized(request))
    }
}

impl<C: Connect> Deref for TestServer<C> {
    type Target = PlanServer<C>;

    fn deref(&self) -> &Self::Target {
        &self.server
    }
}

/// Returns the request path for `id`, percent-encoded.
pub fn item_path(id: &str) -> String {
    format!("/v1/plan/{}", urlencoding::encode(id))
}

/// Returns the `ETag` header of a response, panicking if absent.
pub fn etag_of(response: &Response) -> String {
    response
        .header("ETag")
        .expect("response carries an ETag")
        .to_string()
}

/// Returns a complete insurance plan document with the given id.
pub fn sample_plan(object_id: &str) -> Value {
    json!({
        "objectId": object_id,
        "objectType": "plan",
        "_org": "example.com",
        "planType": "inNetwork",
        "creationDate": "12-12-2017",
        "planCostShares": {
            "objectId": format!("{object_id}-cs"),
            "objectType": "membercostshare",
            "_org": "example.com",
            "deductible": 2000,
            "copay": 23
        },
        "linkedPlanServices": [
            {
                "objectId": format!("{object_id}-svc-1"),
                "objectType": "planservice",
                "_org": "example.com",
                "linkedService": {
                    "objectId": format!("{object_id}-svc-1-ls"),
                    "objectType": "service",
                    "_org": "example.com",
                    "name": "Yearly physical"
                },
                "planserviceCostShares": {
                    "objectId": format!("{object_id}-svc-1-cs"),
                    "objectType": "membercostshare",
                    "_org": "example.com",
                    "deductible": 10,
                    "copay": 0
                }
            }
        ]
    })
}
