//! Repository layer over the local cache.
//!
//! # Responsibility
//! - Define entity-oriented data access contracts.
//! - Isolate SQLite query details from sync/state orchestration.
//!
//! # Invariants
//! - Write paths validate entities before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Writes are single statements or single transactions; nothing spans
//!   more than one repository call.

use crate::db::DbError;
use crate::model::product::ProductValidationError;
use crate::model::user::UserValidationError;
use rust_decimal::Decimal;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

pub mod document_repo;
pub mod order_repo;
pub mod product_repo;
pub mod user_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for cache persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    InvalidProduct(ProductValidationError),
    InvalidUser(UserValidationError),
    Db(DbError),
    NotFound { entity: &'static str, key: String },
    /// A row with the same key already exists and was left untouched.
    Conflict { entity: &'static str, key: String },
    InvalidData(String),
}

impl RepoError {
    pub(crate) fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidProduct(err) => write!(f, "{err}"),
            Self::InvalidUser(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, key } => write!(f, "{entity} not found: {key}"),
            Self::Conflict { entity, key } => write!(f, "{entity} already exists: {key}"),
            Self::InvalidData(message) => write!(f, "invalid cached data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidProduct(err) => Some(err),
            Self::InvalidUser(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound { .. } | Self::Conflict { .. } | Self::InvalidData(_) => None,
        }
    }
}

impl From<ProductValidationError> for RepoError {
    fn from(value: ProductValidationError) -> Self {
        Self::InvalidProduct(value)
    }
}

impl From<UserValidationError> for RepoError {
    fn from(value: UserValidationError) -> Self {
        Self::InvalidUser(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Parses a money column stored as decimal text.
pub(crate) fn parse_decimal(value: &str, column: &str) -> RepoResult<Decimal> {
    Decimal::from_str(value.trim())
        .map_err(|_| RepoError::InvalidData(format!("invalid decimal `{value}` in {column}")))
}
