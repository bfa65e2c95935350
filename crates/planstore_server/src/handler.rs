//! Routing and gates for plan endpoints.

use crate::auth::{parse_bearer, Identity, IdentityVerifier};
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::http::{status, Method, Request, Response};
use crate::schema::SchemaValidator;
use planstore_core::{PlanController, PlanRecord, Preconditions, ReadOutcome};
use planstore_storage::Connect;
use serde_json::Value;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, PartialEq, Eq)]
enum Route<'a> {
    Collection,
    Item(&'a str),
}

/// Handler for plan requests.
///
/// Routes a [`Request`], runs the identity and schema gates, and calls the
/// lifecycle controller. Errors come back as [`ServerError`] for the
/// caller to render.
pub struct RequestHandler<C: Connect> {
    config: ServerConfig,
    controller: PlanController<C>,
    verifier: Arc<dyn IdentityVerifier>,
    schema: Arc<dyn SchemaValidator>,
}

impl<C: Connect> RequestHandler<C> {
    /// Creates a new request handler.
    pub fn new(
        config: ServerConfig,
        controller: PlanController<C>,
        verifier: Arc<dyn IdentityVerifier>,
        schema: Arc<dyn SchemaValidator>,
    ) -> Self {
        Self {
            config,
            controller,
            verifier,
            schema,
        }
    }

    /// Returns the lifecycle controller.
    pub fn controller(&self) -> &PlanController<C> {
        &self.controller
    }

    /// Handles one request.
    ///
    /// Unknown routes produce a plain 404 response rather than an error.
    /// The id segment is percent-decoded before it reaches the controller.
    pub fn handle(&self, request: &Request) -> ServerResult<Response> {
        let Some(route) = self.route(request.route_path()) else {
            return Ok(not_found());
        };

        match (&request.method, route) {
            (Method::Post, Route::Collection) => self.handle_create(request),
            (Method::Get, Route::Item(id)) => self.handle_read(request, &decode_id(id)?),
            (Method::Put, Route::Item(id)) => self.handle_replace(request, &decode_id(id)?),
            (Method::Patch, Route::Item(id)) => self.handle_patch(request, &decode_id(id)?),
            (Method::Delete, Route::Item(id)) => self.handle_delete(request, &decode_id(id)?),
            _ => Ok(not_found()),
        }
    }

    fn handle_create(&self, request: &Request) -> ServerResult<Response> {
        let identity = self.authenticate(request)?;
        let body = self.parse_body(request)?;
        self.schema.validate_document(&body)?;

        let record = self.controller.create(body)?;
        debug!(subject = %identity.subject, object_id = %record.object_id, "create accepted");
        Ok(record_response(status::CREATED, record))
    }

    fn handle_read(&self, request: &Request, id: &str) -> ServerResult<Response> {
        match self.controller.read(id, &preconditions(request))? {
            ReadOutcome::Found(record) => Ok(record_response(status::OK, record)),
            ReadOutcome::NotModified(etag) => {
                Ok(Response::empty(status::NOT_MODIFIED).with_header("ETag", etag.quoted()))
            }
        }
    }

    fn handle_replace(&self, request: &Request, id: &str) -> ServerResult<Response> {
        let identity = self.authenticate(request)?;
        let body = self.parse_body(request)?;
        self.schema.validate_document(&body)?;

        let record = self
            .controller
            .replace(id, body, &preconditions(request))?;
        debug!(subject = %identity.subject, object_id = %record.object_id, "replace accepted");
        Ok(record_response(status::OK, record))
    }

    fn handle_patch(&self, request: &Request, id: &str) -> ServerResult<Response> {
        let identity = self.authenticate(request)?;
        let body = self.parse_body(request)?;
        self.schema.validate_patch(&body)?;

        let record = self.controller.patch(id, &body, &preconditions(request))?;
        debug!(subject = %identity.subject, object_id = %record.object_id, "patch accepted");
        Ok(record_response(status::OK, record))
    }

    fn handle_delete(&self, request: &Request, id: &str) -> ServerResult<Response> {
        let identity = self.authenticate(request)?;
        self.controller.delete(id)?;
        debug!(subject = %identity.subject, object_id = id, "delete accepted");
        Ok(Response::empty(status::NO_CONTENT))
    }

    fn route<'a>(&self, path: &'a str) -> Option<Route<'a>> {
        let rest = path.strip_prefix(self.config.route_prefix.as_str())?;
        match rest {
            "" | "/" => Some(Route::Collection),
            _ => {
                let id = rest.strip_prefix('/')?;
                if id.is_empty() || id.contains('/') {
                    None
                } else {
                    Some(Route::Item(id))
                }
            }
        }
    }

    fn authenticate(&self, request: &Request) -> ServerResult<Identity> {
        if !self.verifier.requires_credential() {
            return Ok(Identity::anonymous());
        }
        let token = parse_bearer(request.headers.get("Authorization"))?;
        self.verifier.verify(token)
    }

    fn parse_body(&self, request: &Request) -> ServerResult<Value> {
        if request.body.len() > self.config.max_body_bytes {
            return Err(ServerError::BadRequest(format!(
                "request body exceeds {} bytes",
                self.config.max_body_bytes
            )));
        }
        if request.body.is_empty() {
            return Err(ServerError::BadRequest("request body is empty".into()));
        }
        serde_json::from_slice(&request.body)
            .map_err(|e| ServerError::BadRequest(format!("malformed JSON: {e}")))
    }
}

fn decode_id(raw: &str) -> ServerResult<Cow<'_, str>> {
    urlencoding::decode(raw)
        .map_err(|_| ServerError::BadRequest("invalid percent-encoding in object id".into()))
}

fn preconditions(request: &Request) -> Preconditions {
    Preconditions {
        if_match: request.headers.get("If-Match").map(str::to_string),
        if_none_match: request.headers.get("If-None-Match").map(str::to_string),
    }
}

fn record_response(status: u16, record: PlanRecord) -> Response {
    Response::json(status, &record.payload).with_header("ETag", record.etag.quoted())
}

fn not_found() -> Response {
    Response::text(status::NOT_FOUND, "Not Found")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AnonymousVerifier, StaticTokenVerifier};
    use crate::schema::PlanSchema;
    use planstore_storage::{InMemoryStore, PoolConfig};
    use serde_json::json;

    fn create_handler(verifier: Arc<dyn IdentityVerifier>) -> RequestHandler<InMemoryStore> {
        let config = ServerConfig::default();
        let controller = PlanController::with_connector(InMemoryStore::new(), PoolConfig::new(2));
        RequestHandler::new(config, controller, verifier, Arc::new(PlanSchema::new().unwrap()))
    }

    fn open_handler() -> RequestHandler<InMemoryStore> {
        create_handler(Arc::new(AnonymousVerifier))
    }

    #[test]
    fn routes() {
        let handler = open_handler();
        assert_eq!(handler.route("/v1/plan"), Some(Route::Collection));
        assert_eq!(handler.route("/v1/plan/"), Some(Route::Collection));
        assert_eq!(handler.route("/v1/plan/abc"), Some(Route::Item("abc")));
        assert_eq!(handler.route("/v1/plan/a/b"), None);
        assert_eq!(handler.route("/v1/planets"), None);
        assert_eq!(handler.route("/v2/plan"), None);
    }

    #[test]
    fn unknown_route_is_plain_not_found() {
        let handler = open_handler();
        for request in [
            Request::new(Method::Get, "/elsewhere"),
            Request::new(Method::Get, "/v1/plan"),
            Request::new(Method::Post, "/v1/plan/abc"),
            Request::new(Method::Other("OPTIONS".into()), "/v1/plan/abc"),
        ] {
            let response = handler.handle(&request).unwrap();
            assert_eq!(response.status, 404);
            assert_eq!(response.body, b"Not Found");
        }
    }

    #[test]
    fn create_and_read() {
        let handler = open_handler();
        let doc = json!({"objectId": "a", "x": 1});

        let created = handler
            .handle(&Request::new(Method::Post, "/v1/plan").with_json(&doc))
            .unwrap();
        assert_eq!(created.status, 201);
        let etag = created.header("ETag").unwrap().to_string();

        let read = handler
            .handle(&Request::new(Method::Get, "/v1/plan/a"))
            .unwrap();
        assert_eq!(read.status, 200);
        assert_eq!(read.header("etag"), Some(etag.as_str()));
        assert_eq!(read.json_body(), Some(doc));
    }

    #[test]
    fn malformed_body_is_bad_request() {
        let handler = open_handler();
        for body in [&b""[..], &b"{not json"[..], &b"[1,2"[..]] {
            let err = handler
                .handle(&Request::new(Method::Post, "/v1/plan").with_body(body))
                .unwrap_err();
            assert_eq!(err.status_code(), 400);
        }
    }

    #[test]
    fn oversized_body_is_bad_request() {
        let config = ServerConfig::default().with_max_body_bytes(16);
        let controller = PlanController::with_connector(InMemoryStore::new(), PoolConfig::new(1));
        let handler = RequestHandler::new(
            config,
            controller,
            Arc::new(AnonymousVerifier),
            Arc::new(PlanSchema::new().unwrap()),
        );

        let doc = json!({"objectId": "a", "padding": "xxxxxxxxxxxxxxxx"});
        let err = handler
            .handle(&Request::new(Method::Post, "/v1/plan").with_json(&doc))
            .unwrap_err();
        assert!(matches!(err, ServerError::BadRequest(_)));
    }

    #[test]
    fn schema_gate_runs_before_controller() {
        let handler = open_handler();
        let err = handler
            .handle(&Request::new(Method::Post, "/v1/plan").with_json(&json!({"x": 1})))
            .unwrap_err();
        assert!(matches!(err, ServerError::SchemaInvalid(_)));
    }

    #[test]
    fn mutations_require_credential() {
        let handler = create_handler(Arc::new(StaticTokenVerifier::new("t0ken", "tester")));
        let doc = json!({"objectId": "a"});

        let err = handler
            .handle(&Request::new(Method::Post, "/v1/plan").with_json(&doc))
            .unwrap_err();
        assert!(matches!(err, ServerError::Unauthorized(_)));

        let err = handler
            .handle(
                &Request::new(Method::Post, "/v1/plan")
                    .with_json(&doc)
                    .with_bearer("wrong"),
            )
            .unwrap_err();
        assert!(matches!(err, ServerError::Unauthorized(_)));

        let ok = handler
            .handle(
                &Request::new(Method::Post, "/v1/plan")
                    .with_json(&doc)
                    .with_bearer("t0ken"),
            )
            .unwrap();
        assert_eq!(ok.status, 201);

        let read = handler
            .handle(&Request::new(Method::Get, "/v1/plan/a"))
            .unwrap();
        assert_eq!(read.status, 200);
    }

    #[test]
    fn auth_runs_before_body_parsing() {
        let handler = create_handler(Arc::new(StaticTokenVerifier::new("t0ken", "tester")));
        let err = handler
            .handle(&Request::new(Method::Put, "/v1/plan/a").with_body("garbage"))
            .unwrap_err();
        assert!(matches!(err, ServerError::Unauthorized(_)));
    }

    #[test]
    fn not_modified_has_no_body() {
        let handler = open_handler();
        let created = handler
            .handle(&Request::new(Method::Post, "/v1/plan").with_json(&json!({"objectId": "a"})))
            .unwrap();
        let etag = created.header("ETag").unwrap().to_string();

        let response = handler
            .handle(&Request::new(Method::Get, "/v1/plan/a").with_header("If-None-Match", etag))
            .unwrap();
        assert_eq!(response.status, 304);
        assert!(response.body.is_empty());
    }

    #[test]
    fn delete_returns_no_content() {
        let handler = open_handler();
        handler
            .handle(&Request::new(Method::Post, "/v1/plan").with_json(&json!({"objectId": "a"})))
            .unwrap();

        let response = handler
            .handle(&Request::new(Method::Delete, "/v1/plan/a"))
            .unwrap();
        assert_eq!(response.status, 204);
        assert!(response.body.is_empty());

        let err = handler
            .handle(&Request::new(Method::Delete, "/v1/plan/a"))
            .unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn item_ids_are_percent_decoded() {
        let handler = open_handler();
        let doc = json!({"objectId": "plan 1/a"});
        handler
            .handle(&Request::new(Method::Post, "/v1/plan").with_json(&doc))
            .unwrap();

        let read = handler
            .handle(&Request::new(Method::Get, "/v1/plan/plan%201%2Fa"))
            .unwrap();
        assert_eq!(read.status, 200);
        assert_eq!(read.json_body(), Some(doc));

        let response = handler
            .handle(&Request::new(Method::Delete, "/v1/plan/plan%201%2Fa"))
            .unwrap();
        assert_eq!(response.status, 204);
    }

    #[test]
    fn invalid_percent_encoding_is_bad_request() {
        let handler = open_handler();
        let err = handler
            .handle(&Request::new(Method::Get, "/v1/plan/%FF%FE"))
            .unwrap_err();
        assert!(matches!(err, ServerError::BadRequest(_)));
        assert_eq!(err.status_code(), 400);
    }
}
