use bulb_llm::Message;

use crate::directive::Directive;

// ---------------------------------------------------------------------------
// Stream failures, classified for the user
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The user must act (sign in, buy credits) before sending again.
    Blocking,
    /// Retry later with the same input.
    Transient,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    Unauthorized(String),
    RateLimited(String),
    QuotaExceeded(String),
    /// Network failure or unexpected endpoint response.
    Failed(String),
}

impl ChatError {
    pub fn severity(&self) -> Severity {
        match self {
            ChatError::RateLimited(_) | ChatError::Failed(_) => Severity::Transient,
            ChatError::Unauthorized(_) | ChatError::QuotaExceeded(_) => Severity::Blocking,
        }
    }

    /// Text shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            ChatError::Unauthorized(_) => "Please sign in to continue.".to_string(),
            ChatError::RateLimited(_) => {
                "Rate limit reached. Please wait a moment and try again.".to_string()
            }
            ChatError::QuotaExceeded(_) => {
                "You have run out of credits. Add credits to keep generating.".to_string()
            }
            ChatError::Failed(detail) => format!("Sorry, something went wrong: {detail}"),
        }
    }
}

impl From<&bulb_llm::Error> for ChatError {
    fn from(error: &bulb_llm::Error) -> Self {
        match error {
            bulb_llm::Error::Unauthorized(m) => ChatError::Unauthorized(m.clone()),
            bulb_llm::Error::RateLimited(m) => ChatError::RateLimited(m.clone()),
            bulb_llm::Error::QuotaExceeded(m) => ChatError::QuotaExceeded(m.clone()),
            other => ChatError::Failed(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Chat events: the protocol from session to frontend
// ---------------------------------------------------------------------------

/// Events emitted by a chat session during one generation.
///
/// ```text
/// UserMessage
/// (TextDelta | GeneratingFile)*
/// TurnComplete | Cancelled | Error
/// ```
#[derive(Debug, Clone)]
pub enum ChatEvent {
    /// The user's message was appended to the conversation.
    UserMessage { message: Message },

    /// A chunk of assistant text arrived. `content` is everything so far.
    TextDelta { delta: String, content: String },

    /// A `CREATE_FILE:` path was seen; its code is streaming in.
    GeneratingFile { path: String },

    /// The stream ended normally. `directive` is what the message asks to
    /// do to the project files, if anything.
    TurnComplete {
        message: Message,
        directive: Option<Directive>,
    },

    /// The user stopped the generation. Text received so far is kept.
    Cancelled { content: String },

    /// The stream failed. Text received so far is kept; `notice` is the
    /// message appended to the conversation, if any.
    Error {
        error: ChatError,
        notice: Option<Message>,
    },
}
