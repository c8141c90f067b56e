//! Repository/sync use-case services.
//!
//! # Responsibility
//! - Merge the local cache with the REST API and the document store.
//! - Expose live read models backed by the cache.
//!
//! # Invariants
//! - The local cache is the only source the UI renders from.
//! - Remote writes are best-effort mirrors of local writes; a failed mirror
//!   is reported but never rolled back.

use crate::remote::api::ApiError;
use crate::remote::store::StoreError;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod catalog_service;
pub mod document_service;
pub mod order_service;
pub mod user_service;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service-level failure.
#[derive(Debug)]
pub enum ServiceError {
    Repo(RepoError),
    Api(ApiError),
    Store(StoreError),
    Seed(serde_json::Error),
    Io(std::io::Error),
    /// Caller input rejected before any I/O.
    InvalidInput(String),
}

impl ServiceError {
    /// Localized message suitable for inline display.
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(err) => err.user_message().to_string(),
            Self::InvalidInput(message) => message.clone(),
            Self::Repo(RepoError::Conflict { .. }) => {
                "El pedido fue recibido, pero no se pudo guardar en este dispositivo.".to_string()
            }
            Self::Repo(_) | Self::Store(_) | Self::Seed(_) | Self::Io(_) => {
                "Ocurrió un error inesperado.".to_string()
            }
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Api(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Seed(err) => write!(f, "invalid seed catalog: {err}"),
            Self::Io(err) => write!(f, "{err}"),
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Api(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::Seed(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::InvalidInput(_) => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<ApiError> for ServiceError {
    fn from(value: ApiError) -> Self {
        Self::Api(value)
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Result of the best-effort remote half of a dual write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorState {
    /// No document store is configured.
    Skipped,
    Mirrored,
    /// The local write stands; the remote copy is stale.
    Failed(String),
}

/// Local write result plus the outcome of its mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DualWrite<T> {
    pub value: T,
    pub mirror: MirrorState,
}
