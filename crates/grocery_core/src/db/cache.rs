//! Shared local cache handle with table-level change notification.
//!
//! # Responsibility
//! - Own the single SQLite connection used by every service.
//! - Broadcast which table a successful write touched.
//! - Turn a read query into a live, replay-latest stream.
//!
//! # Invariants
//! - The connection lock is held for one closure call only, never across an
//!   `.await`.
//! - A live query publishes an empty list when its query fails; it never
//!   closes because of a query error.
//! - A live query task ends once every receiver has been dropped.
//! - Live query reruns never execute SQLite work on a runtime worker.

use super::{open_db, open_db_in_memory, DbResult};
use log::{debug, warn};
use rusqlite::Connection;
use std::fmt::Display;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{broadcast, watch};

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Cache table touched by a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheTable {
    Users,
    Orders,
    Products,
    Documents,
}

impl CacheTable {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Orders => "orders",
            Self::Products => "products",
            Self::Documents => "documents",
        }
    }
}

/// Process-wide local cache.
pub struct LocalCache {
    conn: Mutex<Connection>,
    changes: broadcast::Sender<CacheTable>,
}

impl LocalCache {
    /// Wraps an already migrated connection.
    pub fn from_connection(conn: Connection) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            conn: Mutex::new(conn),
            changes,
        }
    }

    /// Opens (and migrates) the cache file at `path`.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        Ok(Self::from_connection(open_db(path)?))
    }

    pub fn open_in_memory() -> DbResult<Self> {
        Ok(Self::from_connection(open_db_in_memory()?))
    }

    /// Runs a read closure against the connection.
    pub fn read<T, E>(&self, f: impl FnOnce(&Connection) -> Result<T, E>) -> Result<T, E> {
        let conn = self.lock();
        f(&conn)
    }

    /// Runs a write closure and announces `table` when it succeeds.
    pub fn write<T, E>(
        &self,
        table: CacheTable,
        f: impl FnOnce(&Connection) -> Result<T, E>,
    ) -> Result<T, E> {
        let result = {
            let conn = self.lock();
            f(&conn)
        };
        if result.is_ok() {
            self.notify(table);
        }
        result
    }

    /// Announces a change to every live query watching `table`.
    pub fn notify(&self, table: CacheTable) {
        // No subscribers is not an error.
        let _ = self.changes.send(table);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheTable> {
        self.changes.subscribe()
    }

    /// Runs `query` now and again after every write to `table`.
    ///
    /// The first run happens on the caller; reruns go to the blocking pool.
    /// Must be called from within a Tokio runtime.
    pub fn live_query<T, E, F>(
        self: &Arc<Self>,
        table: CacheTable,
        query: F,
    ) -> watch::Receiver<Vec<T>>
    where
        T: Send + Sync + 'static,
        E: Display + 'static,
        F: Fn(&Connection) -> Result<Vec<T>, E> + Send + Sync + 'static,
    {
        let mut changes = self.subscribe();
        let initial = self.run_live(table, &query);
        let (tx, rx) = watch::channel(initial);
        let cache = Arc::clone(self);
        let query = Arc::new(query);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = tx.closed() => break,
                    change = changes.recv() => match change {
                        Ok(changed) if changed != table => continue,
                        Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {
                            let cache = Arc::clone(&cache);
                            let query = Arc::clone(&query);
                            let rerun = tokio::task::spawn_blocking(move || {
                                cache.run_live(table, query.as_ref())
                            });
                            match rerun.await {
                                Ok(rows) => {
                                    tx.send_replace(rows);
                                }
                                Err(err) => {
                                    warn!(
                                        "event=live_query module=db status=error table={} error={}",
                                        table.as_str(),
                                        err
                                    );
                                    break;
                                }
                            }
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
            debug!(
                "event=live_query_closed module=db status=ok table={}",
                table.as_str()
            );
        });

        rx
    }

    fn run_live<T, E: Display>(
        &self,
        table: CacheTable,
        query: &impl Fn(&Connection) -> Result<Vec<T>, E>,
    ) -> Vec<T> {
        match self.read(query) {
            Ok(rows) => rows,
            Err(err) => {
                warn!(
                    "event=live_query module=db status=error table={} error={}",
                    table.as_str(),
                    err
                );
                Vec::new()
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
