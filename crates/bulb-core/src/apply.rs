use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use bulb_llm::MessageId;
use serde::Serialize;

use crate::directive::Directive;
use crate::error::{Error, Result};
use crate::files::{FileRecord, FileStore};

/// What `CREATE_FILE` does when the path already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CreatePolicy {
    /// Replace the existing content.
    #[default]
    Overwrite,
    /// Fail with [`Error::FileExists`] and leave the file alone.
    Reject,
}

impl FromStr for CreatePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overwrite" => Ok(CreatePolicy::Overwrite),
            "reject" => Ok(CreatePolicy::Reject),
            other => Err(format!(
                "unknown create policy '{other}' (expected 'overwrite' or 'reject')"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Create,
    Update,
    Delete,
}

/// A mutation as it was applied, kept around for keep/undo review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileChange {
    pub path: String,
    pub kind: ChangeKind,
    /// `None` when the file did not exist before.
    pub old_content: Option<String>,
    /// `None` when the file was deleted.
    pub new_content: Option<String>,
}

/// User-facing confirmation of an applied mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: ChangeKind,
    pub paths: Vec<String>,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.kind {
            ChangeKind::Create => "Created",
            ChangeKind::Update => "Updated",
            ChangeKind::Delete => "Deleted",
        };
        write!(f, "{verb} {}", self.paths.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyReport {
    pub notice: Option<Notice>,
    pub changes: Vec<FileChange>,
    /// Selected file after the mutation.
    pub active_file: Option<String>,
}

/// Applies at most one directive per assistant message.
#[derive(Debug, Default)]
pub struct Applier {
    policy: CreatePolicy,
    applied: HashSet<MessageId>,
}

impl Applier {
    pub fn new(policy: CreatePolicy) -> Self {
        Self {
            policy,
            applied: HashSet::new(),
        }
    }

    /// Apply the directive of a completed message.
    ///
    /// Returns `Ok(None)` if this message was already applied. A failed
    /// application is not recorded and may be retried.
    pub fn apply<F: FileStore + ?Sized>(
        &mut self,
        message: MessageId,
        directive: &Directive,
        files: &mut F,
        active_file: Option<&str>,
    ) -> Result<Option<ApplyReport>> {
        if self.applied.contains(&message) {
            tracing::debug!(%message, "directive already applied");
            return Ok(None);
        }

        let report = match directive {
            Directive::Create { path, code } => self.create(path, code, files)?,
            Directive::Update { path, code } => update(path, code, files, active_file)?,
            Directive::Delete { paths } => delete(paths, files, active_file)?,
        };

        self.applied.insert(message);
        Ok(Some(report))
    }

    fn create<F: FileStore + ?Sized>(
        &self,
        path: &str,
        code: &str,
        files: &mut F,
    ) -> Result<ApplyReport> {
        let existing = files.get(path)?;
        if existing.is_some() && self.policy == CreatePolicy::Reject {
            return Err(Error::FileExists(path.to_string()));
        }

        files.upsert(FileRecord::new(path, code))?;
        tracing::info!(path, overwrote = existing.is_some(), "created file");

        Ok(ApplyReport {
            notice: Some(Notice {
                kind: ChangeKind::Create,
                paths: vec![path.to_string()],
            }),
            changes: vec![FileChange {
                path: path.to_string(),
                kind: ChangeKind::Create,
                old_content: existing.map(|f| f.content),
                new_content: Some(code.to_string()),
            }],
            active_file: Some(path.to_string()),
        })
    }
}

fn update<F: FileStore + ?Sized>(
    path: &str,
    code: &str,
    files: &mut F,
    active_file: Option<&str>,
) -> Result<ApplyReport> {
    let mut file = files
        .get(path)?
        .ok_or_else(|| Error::FileNotFound(path.to_string()))?;
    let old_content = std::mem::replace(&mut file.content, code.to_string());
    files.upsert(file)?;
    tracing::info!(path, "replaced file content");

    Ok(ApplyReport {
        notice: Some(Notice {
            kind: ChangeKind::Update,
            paths: vec![path.to_string()],
        }),
        changes: vec![FileChange {
            path: path.to_string(),
            kind: ChangeKind::Update,
            old_content: Some(old_content),
            new_content: Some(code.to_string()),
        }],
        active_file: active_file.map(str::to_string),
    })
}

/// Deletes that already happened are reported through
/// [`Error::PartiallyApplied`] if a later store call fails.
fn delete<F: FileStore + ?Sized>(
    paths: &[String],
    files: &mut F,
    active_file: Option<&str>,
) -> Result<ApplyReport> {
    let mut changes = Vec::new();
    let selection = delete_each(paths, files, &mut changes)
        .and_then(|()| selection_after_delete(&changes, files, active_file));
    let active_file = match selection {
        Ok(active_file) => active_file,
        Err(source) if changes.is_empty() => return Err(source),
        Err(source) => {
            return Err(Error::PartiallyApplied {
                changes,
                source: Box::new(source),
            });
        }
    };

    let notice = (!changes.is_empty()).then(|| Notice {
        kind: ChangeKind::Delete,
        paths: changes.iter().map(|c| c.path.clone()).collect(),
    });

    Ok(ApplyReport {
        notice,
        changes,
        active_file,
    })
}

fn delete_each<F: FileStore + ?Sized>(
    paths: &[String],
    files: &mut F,
    changes: &mut Vec<FileChange>,
) -> Result<()> {
    for path in paths {
        if changes.iter().any(|c| &c.path == path) {
            continue;
        }
        let Some(existing) = files.get(path)? else {
            tracing::warn!(path = %path, "delete directive names a missing file");
            continue;
        };
        files.delete(path)?;
        tracing::info!(path = %path, "deleted file");
        changes.push(FileChange {
            path: path.clone(),
            kind: ChangeKind::Delete,
            old_content: Some(existing.content),
            new_content: None,
        });
    }
    Ok(())
}

/// The active file, or the first remaining file if it was deleted.
fn selection_after_delete<F: FileStore + ?Sized>(
    changes: &[FileChange],
    files: &F,
    active_file: Option<&str>,
) -> Result<Option<String>> {
    let active_deleted = active_file.is_some_and(|a| changes.iter().any(|c| c.path == a));
    if active_deleted {
        Ok(files.list()?.into_iter().next().map(|f| f.path))
    } else {
        Ok(active_file.map(str::to_string))
    }
}
