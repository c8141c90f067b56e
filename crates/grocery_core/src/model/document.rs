//! Imported file attachment model.

use serde::{Deserialize, Serialize};

pub type DocumentId = i64;

/// A file copied into app-private storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub display_name: String,
    /// Absolute path inside the documents directory.
    pub local_uri: String,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}
