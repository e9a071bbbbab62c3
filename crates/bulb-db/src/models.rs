use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

/// A conversation entry as persisted. `role` is `"user"` or `"assistant"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub seq: i64,
    pub id: String,
    pub project_id: String,
    pub role: String,
    pub content: String,
    pub images: Vec<String>,
    pub notice: bool,
    pub created_at_ms: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    /// Caller-assigned unique id.
    pub id: String,
    pub role: String,
    pub content: String,
    pub images: Vec<String>,
    pub notice: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    pub project_id: String,
    pub path: String,
    pub content: String,
    pub file_type: String,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}
