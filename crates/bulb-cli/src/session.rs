use std::collections::HashSet;

use bulb_core::{FileRecord, FileStore, Message, MessageId, Role};
use bulb_db::{NewMessage, Project, Store, StoredFile, StoredMessage};

pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// One project in the database: its conversation and its files.
pub struct ProjectStore {
    store: Store,
    project: Project,
    persisted: HashSet<MessageId>,
}

impl ProjectStore {
    pub fn open(mut store: Store, name: &str) -> CliResult<Self> {
        let project = store.projects().upsert(name)?;
        Ok(Self {
            store,
            project,
            persisted: HashSet::new(),
        })
    }

    /// Open a project that must already exist.
    pub fn open_existing(mut store: Store, name: &str) -> CliResult<Self> {
        let project = store
            .projects()
            .by_name(name)?
            .ok_or_else(|| format!("no project named '{name}'"))?;
        Ok(Self {
            store,
            project,
            persisted: HashSet::new(),
        })
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    /// The stored conversation, oldest first.
    pub fn history(&mut self) -> CliResult<Vec<Message>> {
        let stored = self.store.messages().list(&self.project.id)?;
        let messages = stored
            .into_iter()
            .map(message_from_stored)
            .collect::<CliResult<Vec<_>>>()?;
        self.persisted.extend(messages.iter().map(|m| m.id));
        Ok(messages)
    }

    /// Write the messages that are not stored yet. Returns how many were.
    pub fn sync(&mut self, messages: &[Message]) -> CliResult<usize> {
        let mut written = 0;
        for message in messages {
            if self.persisted.contains(&message.id) {
                continue;
            }
            self.store.messages().append(
                &self.project.id,
                NewMessage {
                    id: message.id.to_string(),
                    role: message.role.as_str().to_string(),
                    content: message.content.clone(),
                    images: message.images.clone(),
                    notice: message.notice,
                },
            )?;
            self.persisted.insert(message.id);
            written += 1;
        }
        Ok(written)
    }

    pub fn files(&self) -> ProjectFiles<'_> {
        ProjectFiles {
            store: &self.store,
            project_id: &self.project.id,
        }
    }
}

fn message_from_stored(stored: StoredMessage) -> CliResult<Message> {
    let role = Role::parse(&stored.role)
        .ok_or_else(|| format!("message {} has unknown role '{}'", stored.id, stored.role))?;
    let id = MessageId::parse(&stored.id)
        .ok_or_else(|| format!("message id '{}' is not a uuid", stored.id))?;
    Ok(Message {
        id,
        role,
        content: stored.content,
        images: stored.images,
        notice: stored.notice,
    })
}

/// A project's files as a directive target.
pub struct ProjectFiles<'a> {
    store: &'a Store,
    project_id: &'a str,
}

impl FileStore for ProjectFiles<'_> {
    fn get(&self, path: &str) -> bulb_core::Result<Option<FileRecord>> {
        let file = self
            .store
            .files()
            .get(self.project_id, path)
            .map_err(bulb_core::Error::store)?;
        Ok(file.map(record_from_stored))
    }

    fn list(&self) -> bulb_core::Result<Vec<FileRecord>> {
        let files = self
            .store
            .files()
            .list(self.project_id)
            .map_err(bulb_core::Error::store)?;
        Ok(files.into_iter().map(record_from_stored).collect())
    }

    fn upsert(&mut self, file: FileRecord) -> bulb_core::Result<()> {
        self.store
            .files()
            .upsert(self.project_id, &file.path, &file.content, &file.file_type)
            .map_err(bulb_core::Error::store)
    }

    fn delete(&mut self, path: &str) -> bulb_core::Result<bool> {
        self.store
            .files()
            .delete(self.project_id, path)
            .map_err(bulb_core::Error::store)
    }
}

fn record_from_stored(file: StoredFile) -> FileRecord {
    FileRecord {
        path: file.path,
        content: file.content,
        file_type: file.file_type,
    }
}
