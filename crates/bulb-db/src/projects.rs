use rusqlite::{OptionalExtension, Row, params};

use crate::database::{Database, collect_rows, now_ms};
use crate::error::{Error, Result};
use crate::models::Project;

pub struct Projects<'db> {
    pub(crate) db: &'db mut Database,
}

impl Projects<'_> {
    /// Get the project called `name`, creating it on first use.
    pub fn upsert(&mut self, name: &str) -> Result<Project> {
        let now = now_ms();
        let tx = self.db.conn.transaction()?;

        let existing = tx
            .query_row(
                "SELECT id, name, created_at_ms, updated_at_ms
                 FROM projects
                 WHERE name = ?1",
                params![name],
                row_to_project,
            )
            .optional()?;

        let project = match existing {
            Some(project) => project,
            None => {
                let id: String = tx.query_row(
                    "SELECT 'proj_' || lower(hex(randomblob(16)))",
                    [],
                    |row| row.get(0),
                )?;
                tx.execute(
                    "INSERT INTO projects (id, name, created_at_ms, updated_at_ms)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![id, name, now, now],
                )?;
                Project {
                    id,
                    name: name.to_string(),
                    created_at_ms: now,
                    updated_at_ms: now,
                }
            }
        };

        tx.commit()?;
        Ok(project)
    }

    pub fn by_name(&self, name: &str) -> Result<Option<Project>> {
        self.db
            .conn
            .query_row(
                "SELECT id, name, created_at_ms, updated_at_ms
                 FROM projects
                 WHERE name = ?1",
                params![name],
                row_to_project,
            )
            .optional()
            .map_err(Error::from)
    }

    pub fn list(&self) -> Result<Vec<Project>> {
        let mut stmt = self.db.conn.prepare(
            "SELECT id, name, created_at_ms, updated_at_ms
             FROM projects
             ORDER BY name ASC",
        )?;
        let iter = stmt.query_map([], row_to_project)?;
        collect_rows(iter)
    }
}

fn row_to_project(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at_ms: row.get(2)?,
        updated_at_ms: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use crate::Store;

    #[test]
    fn upsert_is_keyed_by_name() {
        let mut store = Store::open_in_memory().unwrap();
        let first = store.projects().upsert("demo").unwrap();
        let again = store.projects().upsert("demo").unwrap();
        let other = store.projects().upsert("other").unwrap();

        assert_eq!(first, again);
        assert_ne!(first.id, other.id);
        assert!(first.id.starts_with("proj_"));

        let names: Vec<_> = store
            .projects()
            .list()
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, ["demo", "other"]);
        assert_eq!(store.projects().by_name("missing").unwrap(), None);
    }
}
