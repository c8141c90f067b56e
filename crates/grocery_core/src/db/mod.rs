//! Local cache storage: the SQLite file behind every offline read.
//!
//! # Responsibility
//! - `open`: create or open the cache file and bring its schema to the
//!   latest version (`migrations`).
//! - `cache`: wrap the one connection in [`LocalCache`], serialize access to
//!   it and broadcast a [`CacheTable`] after each successful write so live
//!   queries (catalog, orders, documents) can re-run.
//!
//! # Invariants
//! - Services never see a connection whose schema is not current.
//! - The cache is disposable: an outdated schema is rebuilt empty, and the
//!   catalog, orders and profile are refilled from the seed asset and the
//!   remote sources.
//! - A file written by a newer app build is refused, not downgraded.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod cache;
pub mod migrations;
mod open;

pub use cache::{CacheTable, LocalCache};
pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Failure to open or migrate the local cache.
#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// `PRAGMA user_version` is ahead of every migration this build ships.
    SchemaTooNew { found: u32, supported: u32 },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "local cache error: {err}"),
            Self::SchemaTooNew { found, supported } => write!(
                f,
                "local cache was written by a newer app (schema {found}, this build reads up to {supported}); reinstall or update the app"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::SchemaTooNew { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
