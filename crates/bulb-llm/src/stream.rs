/// An event emitted while a chat response streams in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A fragment of assistant text (`choices[0].delta.content`).
    TextDelta(String),

    /// The endpoint sent `data: [DONE]` or the body ended.
    Done,
}
