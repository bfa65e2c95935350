//! # planstore server
//!
//! HTTP surface for plan objects.
//!
//! This crate provides:
//! - Routing of `POST /v1/plan` and `GET|PUT|PATCH|DELETE /v1/plan/{id}`
//! - Bearer-token identity verification (HMAC-SHA256 signed tokens)
//! - Schema validation of request bodies
//! - Status codes, `ETag` headers and JSON error bodies
//!
//! The server is transport agnostic: it maps a [`Request`] to a
//! [`Response`]. Binding a socket and parsing HTTP off the wire is left to
//! whatever front end embeds it.
//!
//! # Authentication
//!
//! ```rust
//! use planstore_server::{AuthConfig, ServerConfig, TokenValidator};
//!
//! let secret = b"my-secure-secret-32-bytes-long!".to_vec();
//! let config = ServerConfig::default().with_auth(secret.clone());
//!
//! let validator = TokenValidator::new(AuthConfig::new(secret));
//! let token = validator.issue_token("alice").unwrap();
//! assert!(config.require_auth);
//! # let _ = token;
//! ```
//!
//! # Gates
//!
//! Every mutation passes identity verification, then body parsing, then
//! schema validation, and only then reaches the lifecycle controller.
//! Reads are not authenticated.

#![deny(unsafe_code)]
#![warn(missing_docs)]
// Production code MUST NOT use panic!/unwrap()/expect()
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod auth;
mod config;
mod error;
mod handler;
mod http;
mod schema;
mod server;

pub use auth::{
    parse_bearer, AnonymousVerifier, AuthConfig, Identity, IdentityVerifier, StaticTokenVerifier,
    TokenValidator,
};
pub use config::ServerConfig;
pub use error::{ErrorBody, ServerError, ServerResult};
pub use handler::RequestHandler;
pub use http::{status, Headers, Method, Request, Response};
pub use schema::{AcceptAll, PlanSchema, SchemaValidator};
pub use server::PlanServer;
