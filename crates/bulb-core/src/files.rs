use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::Result;

/// A file of a project, unique by path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub path: String,
    pub content: String,
    #[serde(rename = "type")]
    pub file_type: String,
}

impl FileRecord {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        let path = path.into();
        let file_type = file_type_for(&path).to_string();
        Self {
            path,
            content: content.into(),
            file_type,
        }
    }
}

/// Language name for a path, from its extension.
pub fn file_type_for(path: &str) -> &'static str {
    let ext = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "ts" | "tsx" => "typescript",
        "js" | "jsx" | "mjs" | "cjs" => "javascript",
        "css" => "css",
        "html" | "htm" => "html",
        "json" => "json",
        "md" => "markdown",
        "rs" => "rust",
        "py" => "python",
        _ => "text",
    }
}

/// Where directive mutations land. Implemented by the in-memory store below
/// and by the SQLite-backed project files in the CLI.
pub trait FileStore {
    fn get(&self, path: &str) -> Result<Option<FileRecord>>;

    /// All files, ordered by path.
    fn list(&self) -> Result<Vec<FileRecord>>;

    /// Insert or replace the file at `file.path`.
    fn upsert(&mut self, file: FileRecord) -> Result<()>;

    /// Remove a file. Returns whether it existed.
    fn delete(&mut self, path: &str) -> Result<bool>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryFiles {
    files: BTreeMap<String, FileRecord>,
}

impl MemoryFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files(files: impl IntoIterator<Item = FileRecord>) -> Self {
        Self {
            files: files.into_iter().map(|f| (f.path.clone(), f)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FileStore for MemoryFiles {
    fn get(&self, path: &str) -> Result<Option<FileRecord>> {
        Ok(self.files.get(path).cloned())
    }

    fn list(&self) -> Result<Vec<FileRecord>> {
        Ok(self.files.values().cloned().collect())
    }

    fn upsert(&mut self, file: FileRecord) -> Result<()> {
        self.files.insert(file.path.clone(), file);
        Ok(())
    }

    fn delete(&mut self, path: &str) -> Result<bool> {
        Ok(self.files.remove(path).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_types_follow_extensions() {
        assert_eq!(file_type_for("src/App.tsx"), "typescript");
        assert_eq!(file_type_for("index.HTML"), "html");
        assert_eq!(file_type_for("README.md"), "markdown");
        assert_eq!(file_type_for("Makefile"), "text");
        assert_eq!(FileRecord::new("a.js", "").file_type, "javascript");
    }

    #[test]
    fn memory_store_lists_by_path() {
        let mut files = MemoryFiles::with_files([
            FileRecord::new("b.ts", "b"),
            FileRecord::new("a.ts", "a"),
        ]);
        files.upsert(FileRecord::new("c.ts", "c")).unwrap();
        let paths: Vec<_> = files.list().unwrap().into_iter().map(|f| f.path).collect();
        assert_eq!(paths, ["a.ts", "b.ts", "c.ts"]);

        assert!(files.delete("b.ts").unwrap());
        assert!(!files.delete("b.ts").unwrap());
        assert_eq!(files.len(), 2);
    }
}
