//! Imported document repository.

use crate::model::document::{Document, DocumentId};
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

pub trait DocumentRepository {
    fn insert(&self, display_name: &str, local_uri: &str, created_at: i64)
        -> RepoResult<Document>;
    fn get(&self, id: DocumentId) -> RepoResult<Option<Document>>;
    fn list_all(&self) -> RepoResult<Vec<Document>>;
    fn delete(&self, id: DocumentId) -> RepoResult<()>;
}

pub struct SqliteDocumentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDocumentRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl DocumentRepository for SqliteDocumentRepository<'_> {
    fn insert(
        &self,
        display_name: &str,
        local_uri: &str,
        created_at: i64,
    ) -> RepoResult<Document> {
        self.conn.execute(
            "INSERT INTO documents (display_name, local_uri, created_at) VALUES (?1, ?2, ?3);",
            params![display_name, local_uri, created_at],
        )?;
        Ok(Document {
            id: self.conn.last_insert_rowid(),
            display_name: display_name.to_string(),
            local_uri: local_uri.to_string(),
            created_at,
        })
    }

    fn get(&self, id: DocumentId) -> RepoResult<Option<Document>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, display_name, local_uri, created_at FROM documents WHERE id = ?1;",
        )?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_document_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_all(&self) -> RepoResult<Vec<Document>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, display_name, local_uri, created_at
             FROM documents
             ORDER BY created_at DESC, id DESC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut documents = Vec::new();
        while let Some(row) = rows.next()? {
            documents.push(parse_document_row(row)?);
        }
        Ok(documents)
    }

    fn delete(&self, id: DocumentId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM documents WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::not_found("document", id));
        }
        Ok(())
    }
}

fn parse_document_row(row: &Row<'_>) -> RepoResult<Document> {
    Ok(Document {
        id: row.get("id")?,
        display_name: row.get("display_name")?,
        local_uri: row.get("local_uri")?,
        created_at: row.get("created_at")?,
    })
}
