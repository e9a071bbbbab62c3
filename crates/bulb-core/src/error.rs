use crate::apply::FileChange;
use crate::review::ReviewState;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("message is empty")]
    EmptyInput,

    #[error("message is too long ({len} characters, the limit is {max})")]
    InputTooLong { len: usize, max: usize },

    #[error("a response is already being generated")]
    GenerationInProgress,

    #[error("file already exists: {0}")]
    FileExists(String),

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("no change under review for {0}")]
    NoChange(String),

    #[error("change to {path} was already {state}")]
    AlreadyResolved { path: String, state: ReviewState },

    /// A batch failed midway. `changes` were applied and can be reviewed.
    #[error("applied {} change(s) before failing: {source}", .changes.len())]
    PartiallyApplied {
        changes: Vec<FileChange>,
        source: Box<Error>,
    },

    #[error("store error: {0}")]
    Store(Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    pub fn store(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Error::Store(Box::new(error))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
