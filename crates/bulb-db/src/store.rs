use std::path::Path;

use crate::database::Database;
use crate::error::Result;
use crate::files::Files;
use crate::messages::Messages;
use crate::projects::Projects;

pub struct Store {
    db: Database,
}

impl Store {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            db: Database::open(path.as_ref())?,
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            db: Database::open_in_memory()?,
        })
    }

    pub fn projects(&mut self) -> Projects<'_> {
        Projects { db: &mut self.db }
    }

    pub fn messages(&mut self) -> Messages<'_> {
        Messages { db: &mut self.db }
    }

    /// File access needs no transaction, so a shared borrow is enough.
    pub fn files(&self) -> Files<'_> {
        Files { db: &self.db }
    }
}
