use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{Connection, Row, params};

use crate::error::{Error, Result};
use crate::migration;

pub(crate) struct Database {
    pub(crate) conn: Connection,
}

impl Database {
    pub(crate) fn open(path: &Path) -> Result<Self> {
        prepare_db_file(path)?;

        let mut conn = Connection::open(path)?;
        configure_connection(&conn)?;
        migration::apply(&mut conn)?;

        Ok(Self { conn })
    }

    pub(crate) fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        configure_connection(&conn)?;
        migration::apply(&mut conn)?;

        Ok(Self { conn })
    }

    pub(crate) fn ensure_project_exists(&self, project_id: &str) -> Result<()> {
        let exists = self
            .conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM projects WHERE id = ?1)",
                params![project_id],
                |row| row.get::<_, i64>(0),
            )
            .map(|n| n != 0)?;
        if exists {
            Ok(())
        } else {
            Err(Error::ProjectNotFound(project_id.to_string()))
        }
    }
}

fn prepare_db_file(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;",
    )?;
    Ok(())
}

pub(crate) fn collect_rows<T, F>(iter: rusqlite::MappedRows<'_, F>) -> Result<Vec<T>>
where
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let mut rows = Vec::new();
    for row in iter {
        rows.push(row?);
    }
    Ok(rows)
}

pub(crate) fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
