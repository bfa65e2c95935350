//! Bounded connection pool with scoped acquisition.

use crate::backend::Connect;
use crate::error::{StorageError, StorageResult};
use crate::DEFAULT_OPERATION_TIMEOUT;
use parking_lot::{Condvar, Mutex};
use std::ops::Deref;
use std::time::{Duration, Instant};
use tracing::debug;

/// Configuration for a [`StorePool`].
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of open connections.
    pub max_size: usize,
    /// How long `acquire` waits for a free connection.
    pub acquire_timeout: Duration,
}

impl PoolConfig {
    /// Creates a pool configuration with the given size.
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size: max_size.max(1),
            acquire_timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }

    /// Sets the acquire timeout.
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new(16)
    }
}

struct PoolState<T> {
    idle: Vec<T>,
    open: usize,
    closed: bool,
}

/// A long-lived pool of store connections.
///
/// Connections are opened lazily up to `max_size`. [`StorePool::acquire`]
/// hands out a [`PooledConnection`] guard; the connection goes back to the
/// pool when the guard is dropped, on every exit path, exactly once.
///
/// # Example
///
/// ```rust
/// use planstore_storage::{InMemoryStore, KvStore, PoolConfig, StorePool};
///
/// let pool = StorePool::new(InMemoryStore::new(), PoolConfig::new(2));
/// {
///     let conn = pool.acquire().unwrap();
///     conn.set("k", b"v").unwrap();
/// }
/// assert_eq!(pool.idle_count(), 1);
/// ```
pub struct StorePool<C: Connect> {
    connector: C,
    config: PoolConfig,
    state: Mutex<PoolState<C::Connection>>,
    available: Condvar,
}

impl<C: Connect> StorePool<C> {
    /// Creates a new pool drawing connections from `connector`.
    pub fn new(connector: C, config: PoolConfig) -> Self {
        Self {
            connector,
            config,
            state: Mutex::new(PoolState {
                idle: Vec::new(),
                open: 0,
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Returns the pool configuration.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Borrows a connection for the duration of one logical operation.
    ///
    /// # Errors
    ///
    /// - [`StorageError::Timeout`] if no connection frees up in time
    /// - [`StorageError::Closed`] if the pool was closed
    /// - Any error from opening a new connection
    pub fn acquire(&self) -> StorageResult<PooledConnection<'_, C>> {
        let deadline = Instant::now() + self.config.acquire_timeout;
        let mut state = self.state.lock();

        loop {
            if state.closed {
                return Err(StorageError::Closed);
            }

            if let Some(conn) = state.idle.pop() {
                return Ok(PooledConnection::new(self, conn));
            }

            if state.open < self.config.max_size {
                state.open += 1;
                drop(state);

                return match self.connector.connect() {
                    Ok(conn) => {
                        debug!("opened pooled store connection");
                        Ok(PooledConnection::new(self, conn))
                    }
                    Err(e) => {
                        self.state.lock().open -= 1;
                        self.available.notify_one();
                        Err(e)
                    }
                };
            }

            if self.available.wait_until(&mut state, deadline).timed_out() {
                return Err(StorageError::Timeout {
                    operation: "acquire",
                    waited: self.config.acquire_timeout,
                });
            }
        }
    }

    /// Closes the pool: idle connections are dropped and future
    /// acquisitions fail. Connections currently borrowed are dropped when
    /// their guards are released.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        state.open -= state.idle.len();
        state.idle.clear();
        self.available.notify_all();
    }

    /// Returns true if the pool was closed.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Returns the number of idle connections.
    pub fn idle_count(&self) -> usize {
        self.state.lock().idle.len()
    }

    /// Returns the number of open connections, idle or borrowed.
    pub fn open_count(&self) -> usize {
        self.state.lock().open
    }

    fn release(&self, conn: C::Connection) {
        let mut state = self.state.lock();
        if state.closed {
            state.open -= 1;
            return;
        }
        state.idle.push(conn);
        drop(state);
        self.available.notify_one();
    }
}

/// A connection borrowed from a [`StorePool`].
///
/// Dereferences to the underlying connection. Dropping the guard returns
/// the connection handle to its pool.
pub struct PooledConnection<'a, C: Connect> {
    pool: &'a StorePool<C>,
    conn: C::Connection,
}

impl<'a, C: Connect> PooledConnection<'a, C> {
    fn new(pool: &'a StorePool<C>, conn: C::Connection) -> Self {
        Self { pool, conn }
    }
}

impl<C: Connect> Deref for PooledConnection<'_, C> {
    type Target = C::Connection;

    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl<C: Connect> Drop for PooledConnection<'_, C> {
    fn drop(&mut self) {
        self.pool.release(self.conn.clone());
    }
}
