use crate::request::ChatRequest;
use crate::response::Response;

/// A concrete, type-erased chat model handle.
///
/// Wraps a [`ChatBackend`] so callers never need generics.
pub struct ChatModel {
    inner: Box<dyn ChatBackend>,
}

impl ChatModel {
    /// Wrap any backend implementation into a model.
    pub fn new(backend: impl ChatBackend + 'static) -> Self {
        Self {
            inner: Box::new(backend),
        }
    }

    /// Human-readable backend name, used in logs.
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Start a streaming chat completion.
    pub fn stream_chat(&self, request: ChatRequest) -> Response {
        self.inner.stream_chat(request)
    }
}

/// Trait that backend crates implement for a chat stream endpoint.
pub trait ChatBackend: Send + Sync {
    fn name(&self) -> &str;
    fn stream_chat(&self, request: ChatRequest) -> Response;
}
