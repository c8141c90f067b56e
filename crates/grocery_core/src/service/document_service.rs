//! Imported document management.
//!
//! # Responsibility
//! - Copy user-selected files into the app-private documents directory.
//! - Track imported files in the `documents` cache table.
//!
//! # Invariants
//! - Stored file names are fresh UUIDs; the original extension is kept.
//! - A row is only inserted after the copy succeeded.
//! - Deleting removes the row first; file removal is best-effort.

use crate::db::{CacheTable, LocalCache};
use crate::model::document::{Document, DocumentId};
use crate::model::now_epoch_ms;
use crate::repo::document_repo::{DocumentRepository, SqliteDocumentRepository};
use crate::repo::{RepoError, RepoResult};
use crate::service::{ServiceError, ServiceResult};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

#[derive(Clone)]
pub struct DocumentService {
    cache: Arc<LocalCache>,
    documents_dir: PathBuf,
}

impl DocumentService {
    pub fn new(cache: Arc<LocalCache>, documents_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache,
            documents_dir: documents_dir.into(),
        }
    }

    pub fn documents_dir(&self) -> &Path {
        &self.documents_dir
    }

    /// Copies `source_path` into the documents directory and records it.
    ///
    /// A blank `display_name` falls back to the source file name.
    pub async fn import(
        &self,
        source_path: impl AsRef<Path>,
        display_name: &str,
    ) -> ServiceResult<Document> {
        let source_path = source_path.as_ref();
        let display_name = match display_name.trim() {
            "" => source_path
                .file_name()
                .and_then(|name| name.to_str())
                .ok_or_else(|| {
                    ServiceError::InvalidInput("El archivo no tiene nombre.".to_string())
                })?
                .to_string(),
            name => name.to_string(),
        };

        tokio::fs::create_dir_all(&self.documents_dir).await?;
        let target = self.documents_dir.join(stored_file_name(source_path));
        tokio::fs::copy(source_path, &target).await?;

        let local_uri = target.to_string_lossy().into_owned();
        let inserted = self.cache.write(CacheTable::Documents, |conn| {
            SqliteDocumentRepository::new(conn).insert(&display_name, &local_uri, now_epoch_ms())
        });
        match inserted {
            Ok(document) => {
                info!(
                    "event=document_import module=service status=ok document_id={}",
                    document.id
                );
                Ok(document)
            }
            Err(err) => {
                remove_file_best_effort(&target).await;
                Err(err.into())
            }
        }
    }

    /// Live view of imported documents, newest first.
    pub fn observe(&self) -> watch::Receiver<Vec<Document>> {
        self.cache.live_query(CacheTable::Documents, |conn| {
            SqliteDocumentRepository::new(conn).list_all()
        })
    }

    pub fn list(&self) -> RepoResult<Vec<Document>> {
        self.cache
            .read(|conn| SqliteDocumentRepository::new(conn).list_all())
    }

    pub fn get(&self, id: DocumentId) -> RepoResult<Option<Document>> {
        self.cache
            .read(|conn| SqliteDocumentRepository::new(conn).get(id))
    }

    /// Deletes the row, then the stored file.
    pub async fn delete(&self, id: DocumentId) -> ServiceResult<()> {
        let document = self
            .get(id)?
            .ok_or_else(|| RepoError::not_found("document", id))?;
        self.cache.write(CacheTable::Documents, |conn| {
            SqliteDocumentRepository::new(conn).delete(id)
        })?;
        remove_file_best_effort(Path::new(&document.local_uri)).await;
        Ok(())
    }
}

fn stored_file_name(source_path: &Path) -> String {
    let id = Uuid::new_v4();
    match source_path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if !ext.is_empty() => format!("{id}.{ext}"),
        _ => id.to_string(),
    }
}

async fn remove_file_best_effort(path: &Path) {
    if let Err(err) = tokio::fs::remove_file(path).await {
        warn!(
            "event=document_file_remove module=service status=error error={}",
            err
        );
    }
}

#[cfg(test)]
mod tests {
    use super::stored_file_name;
    use std::path::Path;

    #[test]
    fn stored_file_name_keeps_extension() {
        let name = stored_file_name(Path::new("/tmp/boleta.pdf"));
        assert!(name.ends_with(".pdf"));
        assert_eq!(name.len(), 36 + 4);

        let bare = stored_file_name(Path::new("/tmp/README"));
        assert_eq!(bare.len(), 36);
    }
}
