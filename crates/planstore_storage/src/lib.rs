//! # planstore storage
//!
//! Key-value substrate for planstore.
//!
//! Stores are **opaque byte stores** keyed by string. They know nothing
//! about JSON, etags or plans; the lifecycle controller in `planstore_core`
//! owns all interpretation of the bytes.
//!
//! ## Design Principles
//!
//! - The minimal surface is `get`, `set` and `delete`
//! - Check-then-act races are closed by the store, not by callers:
//!   `set_if_absent` and `compare_and_swap` are single atomic calls
//! - Every blocking acquisition is bounded by a timeout
//! - Connections are borrowed from a [`StorePool`] and returned on drop
//!
//! ## Available Stores
//!
//! - [`InMemoryStore`] - For testing and ephemeral deployments
//! - [`FileStore`] - One file per key under a root directory
//!
//! ## Example
//!
//! ```rust
//! use planstore_storage::{CasOutcome, InMemoryStore, KvStore};
//!
//! let store = InMemoryStore::new();
//! assert!(store.set_if_absent("a", b"1").unwrap());
//! assert!(!store.set_if_absent("a", b"2").unwrap());
//! assert_eq!(
//!     store.compare_and_swap("a", b"1", b"3").unwrap(),
//!     CasOutcome::Swapped
//! );
//! assert_eq!(store.get("a").unwrap(), Some(b"3".to_vec()));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod backend;
mod error;
mod file;
mod memory;
mod pool;

pub use backend::{CasOutcome, Connect, KvStore};
pub use error::{StorageError, StorageResult};
pub use file::FileStore;
pub use memory::InMemoryStore;
pub use pool::{PoolConfig, PooledConnection, StorePool};

/// Default bound on a single store operation.
pub const DEFAULT_OPERATION_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);
