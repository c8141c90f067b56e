//! Remote document-store port and in-memory implementation.
//!
//! # Responsibility
//! - Describe the cloud document database as collections of JSON documents
//!   keyed by string, with get-once reads and live listeners.
//! - Provide an in-memory store for local emulation and tests.
//!
//! # Invariants
//! - `set` replaces the whole document (last write wins).
//! - Listeners replay the latest collection snapshot on subscribe and after
//!   every successful write.
//! - Store errors keep their original cause.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

pub type StoreResult<T> = Result<T, StoreError>;

/// One stored document.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub key: String,
    pub data: Value,
}

/// Document-store failure.
#[derive(Debug)]
pub enum StoreError {
    NotFound { collection: String, key: String },
    /// Backend failure with the original cause retained.
    Backend(Box<dyn Error + Send + Sync>),
    Decode(serde_json::Error),
}

impl StoreError {
    pub fn backend(err: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        Self::Backend(err.into())
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { collection, key } => {
                write!(f, "document not found: {collection}/{key}")
            }
            Self::Backend(err) => write!(f, "document store error: {err}"),
            Self::Decode(err) => write!(f, "invalid document: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NotFound { .. } => None,
            Self::Backend(err) => Some(err.as_ref()),
            Self::Decode(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Decode(value)
    }
}

/// Remote document database.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, key: &str) -> StoreResult<Option<Value>>;
    async fn list(&self, collection: &str) -> StoreResult<Vec<StoredDocument>>;
    /// Documents whose top-level `field` equals `value`.
    async fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> StoreResult<Vec<StoredDocument>>;
    async fn set(&self, collection: &str, key: &str, data: Value) -> StoreResult<()>;
    /// Merges top-level fields into an existing document.
    async fn update_fields(
        &self,
        collection: &str,
        key: &str,
        fields: Map<String, Value>,
    ) -> StoreResult<()>;
    async fn delete(&self, collection: &str, key: &str) -> StoreResult<()>;
    /// Live feed of the whole collection.
    fn listen(&self, collection: &str) -> watch::Receiver<Vec<StoredDocument>>;
}

/// In-process document store.
///
/// `set_offline(true)` makes every call fail with a backend error, which
/// emulates a lost connection.
#[derive(Default)]
pub struct InMemoryDocumentStore {
    collections: Mutex<BTreeMap<String, BTreeMap<String, Value>>>,
    listeners: Mutex<HashMap<String, watch::Sender<Vec<StoredDocument>>>>,
    offline: AtomicBool,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::backend("document store unavailable"));
        }
        Ok(())
    }

    fn collections(&self) -> MutexGuard<'_, BTreeMap<String, BTreeMap<String, Value>>> {
        self.collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self, collection: &str) -> Vec<StoredDocument> {
        self.collections()
            .get(collection)
            .map(|documents| {
                documents
                    .iter()
                    .map(|(key, data)| StoredDocument {
                        key: key.clone(),
                        data: data.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn publish(&self, collection: &str) {
        let snapshot = self.snapshot(collection);
        let listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(sender) = listeners.get(collection) {
            sender.send_replace(snapshot);
        }
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, collection: &str, key: &str) -> StoreResult<Option<Value>> {
        self.ensure_online()?;
        Ok(self
            .collections()
            .get(collection)
            .and_then(|documents| documents.get(key))
            .cloned())
    }

    async fn list(&self, collection: &str) -> StoreResult<Vec<StoredDocument>> {
        self.ensure_online()?;
        Ok(self.snapshot(collection))
    }

    async fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> StoreResult<Vec<StoredDocument>> {
        self.ensure_online()?;
        Ok(self
            .snapshot(collection)
            .into_iter()
            .filter(|document| document.data.get(field) == Some(value))
            .collect())
    }

    async fn set(&self, collection: &str, key: &str, data: Value) -> StoreResult<()> {
        self.ensure_online()?;
        self.collections()
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_string(), data);
        self.publish(collection);
        Ok(())
    }

    async fn update_fields(
        &self,
        collection: &str,
        key: &str,
        fields: Map<String, Value>,
    ) -> StoreResult<()> {
        self.ensure_online()?;
        {
            let mut collections = self.collections();
            let document = collections
                .get_mut(collection)
                .and_then(|documents| documents.get_mut(key))
                .ok_or_else(|| StoreError::NotFound {
                    collection: collection.to_string(),
                    key: key.to_string(),
                })?;
            match document {
                Value::Object(existing) => existing.extend(fields),
                other => *other = Value::Object(fields),
            }
        }
        self.publish(collection);
        Ok(())
    }

    async fn delete(&self, collection: &str, key: &str) -> StoreResult<()> {
        self.ensure_online()?;
        let removed = self
            .collections()
            .get_mut(collection)
            .and_then(|documents| documents.remove(key));
        if removed.is_none() {
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                key: key.to_string(),
            });
        }
        self.publish(collection);
        Ok(())
    }

    fn listen(&self, collection: &str) -> watch::Receiver<Vec<StoredDocument>> {
        let snapshot = self.snapshot(collection);
        let mut listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        listeners
            .entry(collection.to_string())
            .or_insert_with(|| watch::channel(snapshot).0)
            .subscribe()
    }
}
