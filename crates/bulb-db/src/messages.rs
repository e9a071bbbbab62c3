use rusqlite::types::Type;
use rusqlite::{Row, params};

use crate::database::{Database, collect_rows, now_ms};
use crate::error::Result;
use crate::models::{NewMessage, StoredMessage};

pub struct Messages<'db> {
    pub(crate) db: &'db mut Database,
}

impl Messages<'_> {
    pub fn append(&mut self, project_id: &str, message: NewMessage) -> Result<StoredMessage> {
        self.db.ensure_project_exists(project_id)?;

        let now = now_ms();
        let images_json = serde_json::to_string(&message.images)?;
        self.db.conn.execute(
            "INSERT INTO messages (id, project_id, role, content, images_json, notice, created_at_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                message.id,
                project_id,
                message.role,
                message.content,
                images_json,
                message.notice,
                now
            ],
        )?;

        Ok(StoredMessage {
            seq: self.db.conn.last_insert_rowid(),
            id: message.id,
            project_id: project_id.to_string(),
            role: message.role,
            content: message.content,
            images: message.images,
            notice: message.notice,
            created_at_ms: now,
        })
    }

    /// The project's conversation in creation order.
    pub fn list(&self, project_id: &str) -> Result<Vec<StoredMessage>> {
        let mut stmt = self.db.conn.prepare(
            "SELECT seq, id, project_id, role, content, images_json, notice, created_at_ms
             FROM messages
             WHERE project_id = ?1
             ORDER BY created_at_ms ASC, seq ASC",
        )?;
        let iter = stmt.query_map(params![project_id], row_to_message)?;
        collect_rows(iter)
    }
}

fn row_to_message(row: &Row<'_>) -> rusqlite::Result<StoredMessage> {
    let images_json: String = row.get(5)?;
    let images = serde_json::from_str(&images_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?;
    Ok(StoredMessage {
        seq: row.get(0)?,
        id: row.get(1)?,
        project_id: row.get(2)?,
        role: row.get(3)?,
        content: row.get(4)?,
        images,
        notice: row.get(6)?,
        created_at_ms: row.get(7)?,
    })
}
