//! # planstore testkit
//!
//! Test utilities for planstore.
//!
//! This crate provides:
//! - Fixtures: servers over memory or temp-dir stores, sample plans,
//!   request builders
//! - Property-based generators for JSON documents using proptest
//! - Concurrency stress helpers for the create and write races
//!
//! ## Usage
//!
//! ```rust
//! use planstore_testkit::prelude::*;
//!
//! let server = TestServer::memory();
//! let response = server.create(&sample_plan("p1"));
//! assert_eq!(response.status, 201);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use stress::*;
