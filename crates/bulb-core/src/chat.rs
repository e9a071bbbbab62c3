use std::sync::Arc;

use bulb_llm::{ChatModel, ChatRequest, Message, MessageId, StreamEvent};
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio_stream::StreamExt;

use crate::directive::DirectiveScanner;
use crate::error::{Error, Result};
use crate::event::{ChatError, ChatEvent};

pub const DEFAULT_MAX_INPUT_CHARS: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputLimits {
    pub max_chars: usize,
}

impl Default for InputLimits {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_INPUT_CHARS,
        }
    }
}

/// One user turn: the text, attached images, and the file open in the
/// editor (the target of bare code blocks in the reply).
#[derive(Debug, Clone, Default)]
pub struct UserInput {
    pub text: String,
    pub images: Vec<String>,
    pub active_file: Option<String>,
}

impl UserInput {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.images = images;
        self
    }

    pub fn with_active_file(mut self, path: impl Into<String>) -> Self {
        self.active_file = Some(path.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Session state (shared between handle and spawned task)
// ---------------------------------------------------------------------------

struct SessionState {
    messages: Vec<Message>,
    /// User message of the generation in flight.
    active: Option<MessageId>,
}

// ---------------------------------------------------------------------------
// ChatSession
// ---------------------------------------------------------------------------

/// A conversation with the chat model. UI-agnostic: communicates via
/// [`ChatEvent`]s. At most one generation runs at a time.
pub struct ChatSession {
    model: Arc<ChatModel>,
    limits: InputLimits,
    state: Arc<Mutex<SessionState>>,
}

impl ChatSession {
    pub fn new(model: ChatModel) -> Self {
        Self::with_history(model, Vec::new())
    }

    /// Resume a stored conversation.
    pub fn with_history(model: ChatModel, messages: Vec<Message>) -> Self {
        Self {
            model: Arc::new(model),
            limits: InputLimits::default(),
            state: Arc::new(Mutex::new(SessionState {
                messages,
                active: None,
            })),
        }
    }

    pub fn limits(&mut self, limits: InputLimits) -> &mut Self {
        self.limits = limits;
        self
    }

    /// The conversation, including the message currently streaming.
    pub fn messages(&self) -> Vec<Message> {
        self.state.lock().messages.clone()
    }

    pub fn is_generating(&self) -> bool {
        self.state.lock().active.is_some()
    }

    /// Send user input and get back a stream of events.
    ///
    /// Fails without touching the conversation if the input is invalid or a
    /// generation is already running. Dropping the returned [`ChatStream`]
    /// cancels the generation.
    pub fn submit(&self, input: UserInput) -> Result<ChatStream> {
        validate(&input, self.limits)?;

        let (request, user_message) = {
            let mut s = self.state.lock();
            if s.active.is_some() {
                return Err(Error::GenerationInProgress);
            }
            let message = Message::user(input.text).with_images(input.images);
            s.active = Some(message.id);
            s.messages.push(message.clone());
            (ChatRequest::from_history(&s.messages), message)
        };

        let (tx, rx) = mpsc::channel(64);
        let (cancel_tx, cancel_rx) = watch::channel(false);

        tokio::spawn(generation(
            Arc::clone(&self.model),
            Arc::clone(&self.state),
            request,
            user_message,
            input.active_file,
            tx,
            cancel_rx,
        ));

        Ok(ChatStream {
            rx,
            cancel: CancelHandle(Arc::new(cancel_tx)),
        })
    }
}

fn validate(input: &UserInput, limits: InputLimits) -> Result<()> {
    if input.text.trim().is_empty() && input.images.is_empty() {
        return Err(Error::EmptyInput);
    }
    let len = input.text.chars().count();
    if len > limits.max_chars {
        return Err(Error::InputTooLong {
            len,
            max: limits.max_chars,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// ChatStream
// ---------------------------------------------------------------------------

/// Events of a single generation. Drop to cancel.
pub struct ChatStream {
    rx: mpsc::Receiver<ChatEvent>,
    cancel: CancelHandle,
}

impl ChatStream {
    /// Get the next event, or `None` once the generation has ended.
    pub async fn next(&mut self) -> Option<ChatEvent> {
        self.rx.recv().await
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A handle that can stop the generation from elsewhere (e.g. a Ctrl-C
    /// listener) while this stream is being read.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }
}

#[derive(Debug, Clone)]
pub struct CancelHandle(Arc<watch::Sender<bool>>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }
}

// ---------------------------------------------------------------------------
// Generation (runs in spawned task)
// ---------------------------------------------------------------------------

enum Outcome {
    Completed,
    Cancelled,
    Failed(bulb_llm::Error),
}

/// Clears the in-flight marker if the task ends without finalizing.
struct InFlight {
    state: Arc<Mutex<SessionState>>,
    user_message: MessageId,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let mut s = self.state.lock();
        if s.active == Some(self.user_message) {
            s.active = None;
        }
    }
}

async fn generation(
    model: Arc<ChatModel>,
    state: Arc<Mutex<SessionState>>,
    request: ChatRequest,
    user_message: Message,
    active_file: Option<String>,
    tx: mpsc::Sender<ChatEvent>,
    mut cancel_rx: watch::Receiver<bool>,
) {
    let _in_flight = InFlight {
        state: Arc::clone(&state),
        user_message: user_message.id,
    };
    let mut receiver_alive = tx
        .send(ChatEvent::UserMessage {
            message: user_message,
        })
        .await
        .is_ok();

    // Stream updates always land on the last message: this placeholder.
    let assistant = Message::assistant("");
    let assistant_id = assistant.id;
    state.lock().messages.push(assistant);

    tracing::debug!(
        backend = model.name(),
        messages = request.messages.len(),
        "starting generation"
    );
    let mut stream = model.stream_chat(request).events();
    let mut scanner = DirectiveScanner::new();
    let mut announced = false;

    let outcome = loop {
        if !receiver_alive {
            break Outcome::Cancelled;
        }

        let event = tokio::select! {
            biased;
            _ = cancel_rx.changed() => break Outcome::Cancelled,
            event = stream.next() => event,
        };

        match event {
            Some(Ok(StreamEvent::TextDelta(delta))) => {
                scanner.push(&delta);
                let content = scanner.text().to_string();
                update_last(&state, assistant_id, &content);
                receiver_alive = tx.send(ChatEvent::TextDelta { delta, content }).await.is_ok();

                let generating = scanner.generating_file().map(str::to_string);
                if !announced && let Some(path) = generating {
                    announced = true;
                    receiver_alive &= tx.send(ChatEvent::GeneratingFile { path }).await.is_ok();
                }
            }
            Some(Ok(StreamEvent::Done)) | None => break Outcome::Completed,
            Some(Err(error)) => break Outcome::Failed(error),
        }
    };
    // Dropping the response aborts the request.
    drop(stream);

    let content = scanner.text().to_string();
    let final_event = {
        let mut s = state.lock();
        let event = match outcome {
            Outcome::Completed => {
                scanner.finish();
                let directive = scanner.directive(active_file.as_deref());
                let message = finalize_last(&mut s.messages, assistant_id, &content, true)
                    .unwrap_or_else(|| Message::assistant(content.clone()));
                tracing::info!(
                    chars = content.len(),
                    directive = directive.is_some(),
                    "generation complete"
                );
                ChatEvent::TurnComplete { message, directive }
            }
            Outcome::Cancelled => {
                finalize_last(&mut s.messages, assistant_id, &content, false);
                tracing::debug!(chars = content.len(), "generation cancelled");
                ChatEvent::Cancelled { content }
            }
            Outcome::Failed(error) => {
                tracing::warn!(%error, chars = content.len(), "generation failed");
                finalize_last(&mut s.messages, assistant_id, &content, false);
                let error = ChatError::from(&error);
                let notice = matches!(error, ChatError::Failed(_))
                    .then(|| Message::notice(error.user_message()));
                if let Some(notice) = &notice {
                    s.messages.push(notice.clone());
                }
                ChatEvent::Error { error, notice }
            }
        };
        s.active = None;
        event
    };

    let _ = tx.send(final_event).await;
}

fn update_last(state: &Mutex<SessionState>, id: MessageId, content: &str) {
    let mut s = state.lock();
    if let Some(last) = s.messages.last_mut()
        && last.id == id
    {
        last.content.clear();
        last.content.push_str(content);
    }
}

/// Settle the streamed message. An empty one is removed unless `keep_empty`.
fn finalize_last(
    messages: &mut Vec<Message>,
    id: MessageId,
    content: &str,
    keep_empty: bool,
) -> Option<Message> {
    let last = messages.last_mut().filter(|m| m.id == id)?;
    if content.is_empty() && !keep_empty {
        messages.pop();
        return None;
    }
    last.content = content.to_string();
    Some(last.clone())
}
