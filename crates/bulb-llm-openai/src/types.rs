//! Chat stream endpoint wire types.
//!
//! These are the raw JSON shapes sent to / received from the endpoint.
//! They are intentionally separate from the bulb-llm public types.

use bulb_llm::ChatRequest;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct WireRequest<'a> {
    pub messages: Vec<WireMessage<'a>>,
    /// Always serialized; `null` when the newest user message has no images.
    pub images: Option<&'a [String]>,
}

#[derive(Debug, Serialize)]
pub struct WireMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

impl<'a> From<&'a ChatRequest> for WireRequest<'a> {
    fn from(request: &'a ChatRequest) -> Self {
        Self {
            messages: request
                .messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            images: request.images(),
        }
    }
}

// ---------------------------------------------------------------------------
// Streaming response
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ChunkEvent {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: Option<ChunkDelta>,
}

#[derive(Debug, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChunkEvent {
    /// `choices[0].delta.content`, when present and non-empty.
    pub fn into_content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()?
            .delta?
            .content
            .filter(|c| !c.is_empty())
    }
}

/// Body of a non-2xx response.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
