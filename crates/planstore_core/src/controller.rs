//! Object lifecycle controller.

use crate::conditional::{Decision, Preconditions};
use crate::error::{CoreError, CoreResult};
use crate::etag::{canonical_bytes, etag_of_bytes};
use crate::merge::merge_patch;
use crate::types::{Etag, ObjectId, PlanRecord};
use planstore_storage::{CasOutcome, Connect, KvStore, PoolConfig, StorePool};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of a read.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome {
    /// The stored object.
    Found(PlanRecord),
    /// `If-None-Match` matched the current etag.
    NotModified(Etag),
}

/// Orchestrates create, read, replace, patch and delete of plan objects.
///
/// The controller holds no per-object state. Every operation borrows one
/// pooled connection for its whole duration and returns it on every exit
/// path.
///
/// # State machine
///
/// Per object id: `Absent -> Present` (create), `Present -> Present`
/// (replace, patch), `Present -> Absent` (delete). Only create is valid
/// from `Absent`.
///
/// # Concurrency
///
/// Create uses the store's `set_if_absent`; replace and patch use
/// `compare_and_swap` against the exact bytes the decision was made on.
/// A writer that loses the race gets [`CoreError::Conflict`] or
/// [`CoreError::PreconditionFailed`] and nothing is written. The
/// controller never retries.
pub struct PlanController<C: Connect> {
    pool: Arc<StorePool<C>>,
}

impl<C: Connect> Clone for PlanController<C> {
    fn clone(&self) -> Self {
        Self {
            pool: Arc::clone(&self.pool),
        }
    }
}

impl<C: Connect> PlanController<C> {
    /// Creates a controller over an existing pool.
    pub fn new(pool: Arc<StorePool<C>>) -> Self {
        Self { pool }
    }

    /// Creates a controller with its own pool over `connector`.
    pub fn with_connector(connector: C, config: PoolConfig) -> Self {
        Self::new(Arc::new(StorePool::new(connector, config)))
    }

    /// Returns the underlying pool.
    pub fn pool(&self) -> &Arc<StorePool<C>> {
        &self.pool
    }

    /// Stores a new object keyed by its `objectId`.
    ///
    /// # Errors
    ///
    /// - [`CoreError::BadRequest`] if `objectId` is missing or empty
    /// - [`CoreError::Conflict`] if the id is already present
    pub fn create(&self, payload: Value) -> CoreResult<PlanRecord> {
        let object_id = ObjectId::from_payload(&payload)?;
        let bytes = canonical_bytes(&payload)?;

        let conn = self.pool.acquire()?;
        if !conn.set_if_absent(object_id.as_str(), &bytes)? {
            warn!(object_id = %object_id, "create rejected: object exists");
            return Err(CoreError::Conflict {
                object_id: object_id.to_string(),
            });
        }

        let etag = etag_of_bytes(&bytes);
        info!(object_id = %object_id, etag = %etag, "created object");
        Ok(PlanRecord {
            object_id,
            payload,
            etag,
        })
    }

    /// Reads an object, honoring `If-None-Match`.
    ///
    /// # Errors
    ///
    /// - [`CoreError::NotFound`] if the id is absent
    pub fn read(&self, id: &str, preconditions: &Preconditions) -> CoreResult<ReadOutcome> {
        let object_id = ObjectId::new(id)?;
        let conn = self.pool.acquire()?;
        let bytes = fetch(&*conn, &object_id)?;
        drop(conn);

        let etag = etag_of_bytes(&bytes);
        if preconditions.evaluate_read(Some(&etag)) == Decision::NotModified {
            debug!(object_id = %object_id, "read not modified");
            return Ok(ReadOutcome::NotModified(etag));
        }

        let payload = parse_stored(&object_id, &bytes)?;
        Ok(ReadOutcome::Found(PlanRecord {
            object_id,
            payload,
            etag,
        }))
    }

    /// Replaces an object's payload wholesale.
    ///
    /// # Errors
    ///
    /// - [`CoreError::BadRequest`] if the payload's `objectId` differs from `id`
    /// - [`CoreError::NotFound`] if the id is absent
    /// - [`CoreError::PreconditionFailed`] if `If-Match` is stale or a
    ///   concurrent write won
    pub fn replace(
        &self,
        id: &str,
        payload: Value,
        preconditions: &Preconditions,
    ) -> CoreResult<PlanRecord> {
        let object_id = ObjectId::new(id)?;
        if ObjectId::from_payload(&payload)? != object_id {
            return Err(CoreError::bad_request("objectId mismatch"));
        }

        self.conditional_write(object_id, preconditions, |_| Ok(payload))
    }

    /// Deep-merges `patch` into an object's payload.
    ///
    /// # Errors
    ///
    /// - [`CoreError::BadRequest`] if `patch` is not a JSON object
    /// - [`CoreError::NotFound`] if the id is absent
    /// - [`CoreError::PreconditionFailed`] if `If-Match` is stale or a
    ///   concurrent write won
    pub fn patch(
        &self,
        id: &str,
        patch: &Value,
        preconditions: &Preconditions,
    ) -> CoreResult<PlanRecord> {
        let object_id = ObjectId::new(id)?;
        if !patch.is_object() {
            return Err(CoreError::bad_request("patch body must be a JSON object"));
        }

        let target = object_id.clone();
        self.conditional_write(object_id, preconditions, move |current| {
            let existing = parse_stored(&target, current)?;
            merge_patch(existing, patch, &target)
        })
    }

    /// Removes an object.
    ///
    /// # Errors
    ///
    /// - [`CoreError::NotFound`] if the id is absent, including on a
    ///   repeated delete
    pub fn delete(&self, id: &str) -> CoreResult<()> {
        let object_id = ObjectId::new(id)?;
        let conn = self.pool.acquire()?;
        if !conn.delete(object_id.as_str())? {
            return Err(CoreError::NotFound {
                object_id: object_id.to_string(),
            });
        }
        info!(object_id = %object_id, "deleted object");
        Ok(())
    }

    // Reads the current bytes, checks `If-Match`, builds the new document
    // and publishes it only if the stored bytes are still the ones read.
    fn conditional_write<F>(
        &self,
        object_id: ObjectId,
        preconditions: &Preconditions,
        build: F,
    ) -> CoreResult<PlanRecord>
    where
        F: FnOnce(&[u8]) -> CoreResult<Value>,
    {
        let conn = self.pool.acquire()?;
        let current = fetch(&*conn, &object_id)?;

        let current_etag = etag_of_bytes(&current);
        if preconditions.evaluate_write(Some(&current_etag)) == Decision::PreconditionFailed {
            warn!(object_id = %object_id, etag = %current_etag, "write rejected: stale If-Match");
            return Err(CoreError::PreconditionFailed {
                object_id: object_id.to_string(),
            });
        }

        let payload = build(&current)?;
        let bytes = canonical_bytes(&payload)?;

        match conn.compare_and_swap(object_id.as_str(), &current, &bytes)? {
            CasOutcome::Swapped => {
                let etag = etag_of_bytes(&bytes);
                info!(object_id = %object_id, etag = %etag, "updated object");
                Ok(PlanRecord {
                    object_id,
                    payload,
                    etag,
                })
            }
            CasOutcome::Mismatch => {
                warn!(object_id = %object_id, "write rejected: concurrent modification");
                Err(CoreError::PreconditionFailed {
                    object_id: object_id.to_string(),
                })
            }
            CasOutcome::Missing => Err(CoreError::NotFound {
                object_id: object_id.to_string(),
            }),
        }
    }
}

fn fetch<S: KvStore + ?Sized>(conn: &S, object_id: &ObjectId) -> CoreResult<Vec<u8>> {
    conn.get(object_id.as_str())?
        .ok_or_else(|| CoreError::NotFound {
            object_id: object_id.to_string(),
        })
}

fn parse_stored(object_id: &ObjectId, bytes: &[u8]) -> CoreResult<Value> {
    serde_json::from_slice(bytes).map_err(|e| CoreError::Corrupted {
        object_id: object_id.to_string(),
        message: e.to_string(),
    })
}
