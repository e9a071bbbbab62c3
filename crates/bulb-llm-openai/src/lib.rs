mod sse;
mod stream;
mod types;

use bulb_llm::{ChatBackend, ChatModel, ChatRequest, Response};
use std::sync::Arc;

pub use stream::decode_events;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Configuration for a chat stream endpoint.
#[derive(Debug, Clone, Default)]
pub struct ChatConfig {
    /// Full URL the chat request is POSTed to.
    pub endpoint: String,
    /// Bearer token of the signed-in user.
    pub auth_token: Option<String>,
}

/// Create a chat model backed by the given endpoint.
pub fn client(config: ChatConfig) -> ChatModel {
    ChatModel::new(ChatClient {
        state: Arc::new(ClientState {
            client: reqwest::Client::new(),
            config,
        }),
    })
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

struct ClientState {
    client: reqwest::Client,
    config: ChatConfig,
}

struct ChatClient {
    state: Arc<ClientState>,
}

impl ChatBackend for ChatClient {
    fn name(&self) -> &str {
        "chat-stream"
    }

    fn stream_chat(&self, request: ChatRequest) -> Response {
        Response::new(stream::open(Arc::clone(&self.state), request))
    }
}
