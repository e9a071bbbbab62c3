pub mod apply;
pub mod chat;
pub mod diff;
pub mod directive;
pub mod error;
pub mod event;
pub mod files;
pub mod review;

pub use apply::{Applier, ApplyReport, ChangeKind, CreatePolicy, FileChange, Notice};
pub use chat::{CancelHandle, ChatSession, ChatStream, InputLimits, UserInput};
pub use diff::{DiffLine, GreedyDiff, LineDiff, LineKind, MyersDiff, diff};
pub use directive::{Directive, DirectiveScanner};
pub use error::{Error, Result};
pub use event::{ChatError, ChatEvent, Severity};
pub use files::{FileRecord, FileStore, MemoryFiles, file_type_for};
pub use review::{Review, ReviewState};

pub use bulb_llm::{ChatModel, Message, MessageId, Role};
