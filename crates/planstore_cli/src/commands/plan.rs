//! Plan lifecycle commands against a file store.

use super::read_json;
use planstore_core::{PlanController, PlanRecord, Preconditions, ReadOutcome};
use planstore_storage::{FileStore, PoolConfig, DEFAULT_OPERATION_TIMEOUT};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Store directory and the bound on each store operation.
#[derive(Debug, Clone)]
pub struct StoreTarget {
    /// Store directory.
    pub path: PathBuf,
    /// Bound on lock waits and pool acquisition.
    pub timeout: Duration,
}

impl StoreTarget {
    /// Targets `path` with the default operation timeout.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }

    /// Sets the operation timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn open(target: &StoreTarget) -> Result<PlanController<FileStore>, Box<dyn std::error::Error>> {
    let store = FileStore::open_with_timeout(&target.path, target.timeout)?;
    let pool = PoolConfig::new(1).with_acquire_timeout(target.timeout);
    Ok(PlanController::with_connector(store, pool))
}

fn preconditions(if_match: Option<String>) -> Preconditions {
    match if_match {
        Some(etag) => Preconditions::none().with_if_match(etag),
        None => Preconditions::none(),
    }
}

fn print_record(record: &PlanRecord) -> CommandResult {
    println!("ETag: {}", record.etag.quoted());
    println!("{}", serde_json::to_string_pretty(&record.payload)?);
    Ok(())
}

/// Runs the create command.
pub fn create(target: &StoreTarget, file: &Path) -> CommandResult {
    let controller = open(target)?;
    let record = controller.create(read_json(file)?)?;
    info!(object_id = %record.object_id, "created");
    print_record(&record)
}

/// Runs the get command.
pub fn get(target: &StoreTarget, id: &str, if_none_match: Option<String>) -> CommandResult {
    let controller = open(target)?;
    let preconditions = match if_none_match {
        Some(etag) => Preconditions::none().with_if_none_match(etag),
        None => Preconditions::none(),
    };
    match controller.read(id, &preconditions)? {
        ReadOutcome::Found(record) => print_record(&record),
        ReadOutcome::NotModified(etag) => {
            println!("Not modified ({})", etag.quoted());
            Ok(())
        }
    }
}

/// Runs the replace command.
pub fn replace(target: &StoreTarget, id: &str, file: &Path, if_match: Option<String>) -> CommandResult {
    let controller = open(target)?;
    let record = controller.replace(id, read_json(file)?, &preconditions(if_match))?;
    info!(object_id = %record.object_id, "replaced");
    print_record(&record)
}

/// Runs the patch command.
pub fn patch(target: &StoreTarget, id: &str, file: &Path, if_match: Option<String>) -> CommandResult {
    let controller = open(target)?;
    let record = controller.patch(id, &read_json(file)?, &preconditions(if_match))?;
    info!(object_id = %record.object_id, "patched");
    print_record(&record)
}

/// Runs the delete command.
pub fn delete(target: &StoreTarget, id: &str) -> CommandResult {
    let controller = open(target)?;
    controller.delete(id)?;
    info!(object_id = id, "deleted");
    println!("Deleted {}", id);
    Ok(())
}
