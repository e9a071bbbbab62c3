//! Keep/undo review of applied file changes.
//!
//! Each change starts `Pending` and ends either `Kept` or `Undone`; both are
//! terminal.

use std::fmt;

use crate::apply::FileChange;
use crate::diff::{DiffLine, LineDiff};
use crate::error::{Error, Result};
use crate::files::{FileRecord, FileStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewState {
    Pending,
    Kept,
    Undone,
}

impl fmt::Display for ReviewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReviewState::Pending => "pending",
            ReviewState::Kept => "kept",
            ReviewState::Undone => "undone",
        })
    }
}

#[derive(Debug)]
struct Entry {
    change: FileChange,
    state: ReviewState,
}

/// Changes under review, keyed by path.
#[derive(Debug, Default)]
pub struct Review {
    entries: Vec<Entry>,
}

impl Review {
    pub fn new(changes: impl IntoIterator<Item = FileChange>) -> Self {
        let mut review = Self::default();
        review.extend(changes);
        review
    }

    /// Add changes. A new change to a path already under review replaces
    /// the old entry but keeps its original content as the undo target.
    pub fn extend(&mut self, changes: impl IntoIterator<Item = FileChange>) {
        for mut change in changes {
            match self.entries.iter_mut().find(|e| e.change.path == change.path) {
                Some(entry) if entry.state == ReviewState::Pending => {
                    change.old_content = entry.change.old_content.take();
                    entry.change = change;
                }
                Some(entry) => {
                    *entry = Entry {
                        change,
                        state: ReviewState::Pending,
                    };
                }
                None => self.entries.push(Entry {
                    change,
                    state: ReviewState::Pending,
                }),
            }
        }
    }

    pub fn pending(&self) -> impl Iterator<Item = &FileChange> {
        self.entries
            .iter()
            .filter(|e| e.state == ReviewState::Pending)
            .map(|e| &e.change)
    }

    pub fn is_settled(&self) -> bool {
        self.pending().next().is_none()
    }

    pub fn state(&self, path: &str) -> Option<ReviewState> {
        self.entry(path).map(|e| e.state)
    }

    pub fn change(&self, path: &str) -> Option<&FileChange> {
        self.entry(path).map(|e| &e.change)
    }

    /// Render the change with the given diff algorithm.
    pub fn diff(&self, path: &str, differ: &dyn LineDiff) -> Option<Vec<DiffLine>> {
        let change = self.change(path)?;
        Some(differ.diff(
            change.old_content.as_deref().unwrap_or_default(),
            change.new_content.as_deref().unwrap_or_default(),
        ))
    }

    pub fn keep(&mut self, path: &str) -> Result<()> {
        let entry = self.pending_entry(path)?;
        entry.state = ReviewState::Kept;
        Ok(())
    }

    pub fn keep_all(&mut self) {
        for entry in &mut self.entries {
            if entry.state == ReviewState::Pending {
                entry.state = ReviewState::Kept;
            }
        }
    }

    /// Restore the content the file had before the change.
    pub fn undo<F: FileStore + ?Sized>(&mut self, path: &str, files: &mut F) -> Result<()> {
        let entry = self.pending_entry(path)?;
        match &entry.change.old_content {
            Some(old) => files.upsert(FileRecord::new(path, old.clone()))?,
            None => {
                files.delete(path)?;
            }
        }
        entry.state = ReviewState::Undone;
        tracing::info!(path, "undid change");
        Ok(())
    }

    fn entry(&self, path: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.change.path == path)
    }

    fn pending_entry(&mut self, path: &str) -> Result<&mut Entry> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.change.path == path)
            .ok_or_else(|| Error::NoChange(path.to_string()))?;
        if entry.state != ReviewState::Pending {
            return Err(Error::AlreadyResolved {
                path: path.to_string(),
                state: entry.state,
            });
        }
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apply::{Applier, ChangeKind};
    use crate::diff::{GreedyDiff, LineKind};
    use crate::directive::Directive;
    use crate::files::MemoryFiles;
    use bulb_llm::MessageId;

    fn applied(files: &mut MemoryFiles, directive: Directive, active: Option<&str>) -> Review {
        let report = Applier::default()
            .apply(MessageId::new(), &directive, files, active)
            .unwrap()
            .unwrap();
        Review::new(report.changes)
    }

    #[test]
    fn keep_is_terminal() {
        let mut files = MemoryFiles::with_files([FileRecord::new("a.ts", "old\n")]);
        let mut review = applied(
            &mut files,
            Directive::Update {
                path: "a.ts".into(),
                code: "new\n".into(),
            },
            Some("a.ts"),
        );

        assert_eq!(review.state("a.ts"), Some(ReviewState::Pending));
        review.keep("a.ts").unwrap();
        assert_eq!(review.state("a.ts"), Some(ReviewState::Kept));
        assert!(review.is_settled());

        let err = review.undo("a.ts", &mut files).unwrap_err();
        assert!(matches!(err, Error::AlreadyResolved { state: ReviewState::Kept, .. }));
        assert!(review.keep("a.ts").is_err());
        assert_eq!(files.get("a.ts").unwrap().unwrap().content, "new\n");
    }

    #[test]
    fn keep_all_settles_only_pending_changes() {
        let mut files = MemoryFiles::with_files([
            FileRecord::new("a.ts", "a"),
            FileRecord::new("b.ts", "b"),
        ]);
        let mut review = applied(
            &mut files,
            Directive::Delete {
                paths: vec!["a.ts".into(), "b.ts".into()],
            },
            None,
        );

        review.undo("a.ts", &mut files).unwrap();
        review.keep_all();

        assert!(review.is_settled());
        assert_eq!(review.state("a.ts"), Some(ReviewState::Undone));
        assert_eq!(review.state("b.ts"), Some(ReviewState::Kept));
        assert_eq!(files.get("a.ts").unwrap().unwrap().content, "a");
        assert_eq!(files.get("b.ts").unwrap(), None);
    }

    #[test]
    fn undo_restores_each_kind_of_change() {
        let mut files = MemoryFiles::with_files([
            FileRecord::new("keep.ts", "k"),
            FileRecord::new("gone.ts", "g"),
        ]);

        let mut created = applied(
            &mut files,
            Directive::Create {
                path: "new.ts".into(),
                code: "n".into(),
            },
            None,
        );
        created.undo("new.ts", &mut files).unwrap();
        assert!(files.get("new.ts").unwrap().is_none());

        let mut deleted = applied(
            &mut files,
            Directive::Delete {
                paths: vec!["gone.ts".into()],
            },
            None,
        );
        assert!(files.get("gone.ts").unwrap().is_none());
        deleted.undo("gone.ts", &mut files).unwrap();
        assert_eq!(files.get("gone.ts").unwrap().unwrap().content, "g");

        let mut updated = applied(
            &mut files,
            Directive::Update {
                path: "keep.ts".into(),
                code: "changed".into(),
            },
            Some("keep.ts"),
        );
        updated.undo("keep.ts", &mut files).unwrap();
        assert_eq!(files.get("keep.ts").unwrap().unwrap().content, "k");
        assert_eq!(updated.state("keep.ts"), Some(ReviewState::Undone));
        assert!(updated.undo("keep.ts", &mut files).is_err());
    }

    #[test]
    fn unknown_paths_are_errors() {
        let mut review = Review::default();
        assert!(matches!(review.keep("x"), Err(Error::NoChange(_))));
        assert!(review.diff("x", &GreedyDiff).is_none());
    }

    #[test]
    fn diff_shows_old_against_new() {
        let mut files = MemoryFiles::with_files([FileRecord::new("a.ts", "one\ntwo")]);
        let review = applied(
            &mut files,
            Directive::Update {
                path: "a.ts".into(),
                code: "one\nthree".into(),
            },
            Some("a.ts"),
        );
        let lines = review.diff("a.ts", &GreedyDiff).unwrap();
        let kinds: Vec<_> = lines.iter().map(|l| l.kind).collect();
        assert_eq!(kinds, [LineKind::Same, LineKind::Remove, LineKind::Add]);
    }

    #[test]
    fn repeated_change_keeps_the_first_undo_target() {
        let mut review = Review::new([FileChange {
            path: "a.ts".into(),
            kind: ChangeKind::Update,
            old_content: Some("v1".into()),
            new_content: Some("v2".into()),
        }]);
        review.extend([FileChange {
            path: "a.ts".into(),
            kind: ChangeKind::Update,
            old_content: Some("v2".into()),
            new_content: Some("v3".into()),
        }]);

        let change = review.change("a.ts").unwrap();
        assert_eq!(change.old_content.as_deref(), Some("v1"));
        assert_eq!(change.new_content.as_deref(), Some("v3"));
        assert_eq!(review.pending().count(), 1);
    }
}
