use rusqlite::{OptionalExtension, Row, params};

use crate::database::{Database, collect_rows, now_ms};
use crate::error::{Error, Result};
use crate::models::StoredFile;

/// Project files, keyed by `(project_id, path)`.
pub struct Files<'db> {
    pub(crate) db: &'db Database,
}

impl Files<'_> {
    pub fn get(&self, project_id: &str, path: &str) -> Result<Option<StoredFile>> {
        self.db
            .conn
            .query_row(
                "SELECT project_id, path, content, file_type, created_at_ms, updated_at_ms
                 FROM files
                 WHERE project_id = ?1 AND path = ?2",
                params![project_id, path],
                row_to_file,
            )
            .optional()
            .map_err(Error::from)
    }

    /// All files of a project, ordered by path.
    pub fn list(&self, project_id: &str) -> Result<Vec<StoredFile>> {
        let mut stmt = self.db.conn.prepare(
            "SELECT project_id, path, content, file_type, created_at_ms, updated_at_ms
             FROM files
             WHERE project_id = ?1
             ORDER BY path ASC",
        )?;
        let iter = stmt.query_map(params![project_id], row_to_file)?;
        collect_rows(iter)
    }

    pub fn upsert(
        &self,
        project_id: &str,
        path: &str,
        content: &str,
        file_type: &str,
    ) -> Result<()> {
        self.db.ensure_project_exists(project_id)?;

        let now = now_ms();
        self.db.conn.execute(
            "INSERT INTO files (project_id, path, content, file_type, created_at_ms, updated_at_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(project_id, path) DO UPDATE SET
                content = excluded.content,
                file_type = excluded.file_type,
                updated_at_ms = excluded.updated_at_ms",
            params![project_id, path, content, file_type, now, now],
        )?;
        Ok(())
    }

    /// Returns whether a file was removed.
    pub fn delete(&self, project_id: &str, path: &str) -> Result<bool> {
        let removed = self.db.conn.execute(
            "DELETE FROM files WHERE project_id = ?1 AND path = ?2",
            params![project_id, path],
        )?;
        Ok(removed > 0)
    }
}

fn row_to_file(row: &Row<'_>) -> rusqlite::Result<StoredFile> {
    Ok(StoredFile {
        project_id: row.get(0)?,
        path: row.get(1)?,
        content: row.get(2)?,
        file_type: row.get(3)?,
        created_at_ms: row.get(4)?,
        updated_at_ms: row.get(5)?,
    })
}
