//! File-based key-value store for persistent storage.

use crate::backend::{CasOutcome, Connect, KvStore};
use crate::error::{StorageError, StorageResult};
use crate::DEFAULT_OPERATION_TIMEOUT;
use parking_lot::{Mutex, MutexGuard};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

const RECORD_EXTENSION: &str = "rec";

/// A directory-backed key-value store.
///
/// Each key is stored in its own file under the root directory. File names
/// are the hex SHA-256 of the key, so keys of any length and content map
/// to safe, fixed-length names. Data survives process restarts.
///
/// # Durability
///
/// Values are written to a temporary file, synced, then renamed into place,
/// so a reader never observes a partially written value.
///
/// # Atomicity
///
/// - `set_if_absent` publishes through `fs::hard_link`, which refuses to
///   replace an existing file, so it is atomic even across processes
/// - `compare_and_swap`, `set` and `delete` are serialized by a lock shared
///   between clones of the store, so they are atomic within one process
///
/// # Example
///
/// ```no_run
/// use planstore_storage::{FileStore, KvStore};
/// use std::path::Path;
///
/// let store = FileStore::open(Path::new("plans")).unwrap();
/// store.set("plan-1", b"{}").unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    write_lock: Arc<Mutex<()>>,
    timeout: Duration,
}

impl FileStore {
    /// Opens a store rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(root: &Path) -> StorageResult<Self> {
        Self::open_with_timeout(root, DEFAULT_OPERATION_TIMEOUT)
    }

    /// Opens a store with the given operation timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open_with_timeout(root: &Path, timeout: Duration) -> StorageResult<Self> {
        fs::create_dir_all(root)?;
        if !root.is_dir() {
            return Err(StorageError::Corrupted(format!(
                "store root {} is not a directory",
                root.display()
            )));
        }

        Ok(Self {
            root: root.to_path_buf(),
            write_lock: Arc::new(Mutex::new(())),
            timeout,
        })
    }

    /// Returns the root directory of the store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the file path used for `key`.
    #[must_use]
    pub fn record_path(&self, key: &str) -> PathBuf {
        self.root
            .join(format!("{}.{}", encode_key(key), RECORD_EXTENSION))
    }

    fn lock(&self, operation: &'static str) -> StorageResult<MutexGuard<'_, ()>> {
        self.write_lock
            .try_lock_for(self.timeout)
            .ok_or(StorageError::Timeout {
                operation,
                waited: self.timeout,
            })
    }

    fn temp_path(&self, key: &str) -> PathBuf {
        self.root.join(format!(
            "{}.{}.tmp",
            encode_key(key),
            std::process::id()
        ))
    }

    fn write_temp(&self, key: &str, value: &[u8]) -> StorageResult<PathBuf> {
        let tmp = self.temp_path(key);
        let mut file = fs::File::create(&tmp)?;
        file.write_all(value)?;
        file.sync_all()?;
        Ok(tmp)
    }

    fn replace_with(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        let tmp = self.write_temp(key, value)?;
        if let Err(e) = fs::rename(&tmp, self.record_path(key)) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    fn read_record(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        match fs::read(self.record_path(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        self.read_record(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        let _guard = self.lock("set")?;
        self.replace_with(key, value)
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        let _guard = self.lock("delete")?;
        match fs::remove_file(self.record_path(key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn set_if_absent(&self, key: &str, value: &[u8]) -> StorageResult<bool> {
        let _guard = self.lock("set_if_absent")?;
        let tmp = self.write_temp(key, value)?;
        let linked = fs::hard_link(&tmp, self.record_path(key));
        let cleanup = fs::remove_file(&tmp);
        publish_outcome(&tmp, linked, cleanup)
    }

    fn compare_and_swap(
        &self,
        key: &str,
        expected: &[u8],
        new: &[u8],
    ) -> StorageResult<CasOutcome> {
        let _guard = self.lock("compare_and_swap")?;
        match self.read_record(key)? {
            None => Ok(CasOutcome::Missing),
            Some(current) if current != expected => Ok(CasOutcome::Mismatch),
            Some(_) => {
                self.replace_with(key, new)?;
                Ok(CasOutcome::Swapped)
            }
        }
    }
}

impl Connect for FileStore {
    type Connection = FileStore;

    fn with_operation_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    fn connect(&self) -> StorageResult<Self::Connection> {
        Ok(self.clone())
    }
}

fn encode_key(key: &str) -> String {
    Sha256::digest(key.as_bytes())
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

// Once the link exists the record is published; a leftover temp file
// must not turn that into an error.
fn publish_outcome(
    tmp: &Path,
    linked: io::Result<()>,
    cleanup: io::Result<()>,
) -> StorageResult<bool> {
    let published = match linked {
        Ok(()) => true,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => false,
        Err(e) => return Err(e.into()),
    };
    if let Err(e) = cleanup {
        warn!(path = %tmp.display(), error = %e, "failed to remove temp file");
    }
    Ok(published)
}
