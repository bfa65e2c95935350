//! # planstore core
//!
//! Lifecycle and concurrency control for JSON plan objects.
//!
//! - [`etag`] - content hash of a document's canonical serialization
//! - [`merge`] - recursive deep merge used by partial updates
//! - [`conditional`] - `If-Match` / `If-None-Match` evaluation
//! - [`PlanController`] - create, read, replace, patch and delete against a
//!   pooled [`planstore_storage::KvStore`]
//!
//! Writes go through the store's atomic `set_if_absent` and
//! `compare_and_swap`, so of several concurrent writers racing on the same
//! prior state at most one succeeds.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

pub mod conditional;
mod controller;
mod error;
pub mod etag;
pub mod merge;
mod types;

pub use conditional::{Decision, Preconditions};
pub use controller::{PlanController, ReadOutcome};
pub use error::{CoreError, CoreResult};
pub use types::{Etag, ObjectId, PlanRecord, OBJECT_ID_FIELD};

/// planstore version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
