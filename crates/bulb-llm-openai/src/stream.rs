//! Opens a streaming chat request and maps `data:` frames to bulb-llm
//! `StreamEvent`s.

use crate::ClientState;
use crate::sse::{Frame, LineDecoder};
use crate::types::{ChunkEvent, ErrorBody, WireRequest};
use bulb_llm::{ChatRequest, Error, StreamEvent};
use futures::Stream;
use std::sync::Arc;
use tokio_stream::StreamExt;

pub fn open(
    state: Arc<ClientState>,
    request: ChatRequest,
) -> impl Stream<Item = Result<StreamEvent, Error>> + Send {
    async_stream::try_stream! {
        let token = state
            .config
            .auth_token
            .clone()
            .ok_or_else(|| Error::Unauthorized("no auth token configured".into()))?;

        tracing::debug!(
            endpoint = %state.config.endpoint,
            messages = request.messages.len(),
            "opening chat stream"
        );

        let req = state
            .client
            .post(&state.config.endpoint)
            .bearer_auth(token)
            .json(&WireRequest::from(&request));

        let resp = req.send().await.map_err(|e| Error::Http(Box::new(e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body_text)
                .map(|body| body.error)
                .unwrap_or(body_text);
            tracing::warn!(status = status.as_u16(), %message, "chat stream request rejected");
            Err::<(), _>(Error::from_status(status.as_u16(), message))?;
            unreachable!();
        }

        let mut events = Box::pin(decode_events(resp.bytes_stream()));
        while let Some(event) = events.next().await {
            yield event?;
        }
    }
}

/// Turn a raw response body into text deltas followed by a single `Done`.
///
/// Malformed JSON payloads are skipped. Reading stops at `data: [DONE]`;
/// otherwise the trailing partial line is flushed when the body ends.
pub fn decode_events<S, B, E>(body: S) -> impl Stream<Item = Result<StreamEvent, Error>> + Send
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: std::error::Error + Send + Sync + 'static,
{
    async_stream::try_stream! {
        let mut body = Box::pin(body);
        let mut decoder = LineDecoder::new();

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| Error::Http(Box::new(e)))?;
            for frame in decoder.push(chunk.as_ref()) {
                if let Some(event) = map_frame(frame) {
                    yield event;
                }
            }
            if decoder.is_done() {
                break;
            }
        }

        for frame in decoder.finish() {
            if let Some(event) = map_frame(frame) {
                yield event;
            }
        }
        yield StreamEvent::Done;
    }
}

fn map_frame(frame: Frame) -> Option<StreamEvent> {
    let Frame::Data(data) = frame else {
        return None;
    };
    match serde_json::from_str::<ChunkEvent>(&data) {
        Ok(event) => event.into_content().map(StreamEvent::TextDelta),
        Err(error) => {
            tracing::debug!(%error, "skipping malformed stream fragment");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta_line(content: &str) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({ "choices": [{ "delta": { "content": content } }] })
        )
    }

    async fn collect(chunks: Vec<Vec<u8>>) -> Vec<StreamEvent> {
        let body = futures::stream::iter(chunks.into_iter().map(Ok::<_, std::io::Error>));
        let events: Vec<_> = decode_events(body).collect().await;
        events.into_iter().map(|e| e.unwrap()).collect()
    }

    fn text_of(events: &[StreamEvent]) -> String {
        events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::TextDelta(t) => Some(t.as_str()),
                StreamEvent::Done => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn reassembly_is_independent_of_chunk_boundaries() {
        let mut body = String::new();
        for part in ["fn main() {\n", "    println!(\"hi ✓\");\n", "}\n"] {
            body.push_str(&delta_line(part));
        }
        body.push_str("data: [DONE]\n\n");
        let bytes = body.into_bytes();

        let whole = collect(vec![bytes.clone()]).await;
        let expected = "fn main() {\n    println!(\"hi ✓\");\n}\n";
        assert_eq!(text_of(&whole), expected);

        for size in [1, 2, 3, 5, 7, 16, 64] {
            let chunks = bytes.chunks(size).map(<[u8]>::to_vec).collect();
            assert_eq!(text_of(&collect(chunks).await), expected, "chunk size {size}");
        }
    }

    #[tokio::test]
    async fn malformed_fragments_are_skipped() {
        let mut body = delta_line("a");
        body.push_str("data: {not json}\n\n");
        body.push_str(&delta_line("b"));
        body.push_str("data: [DONE]\n\n");
        let events = collect(vec![body.into_bytes()]).await;
        assert_eq!(
            events,
            vec![
                StreamEvent::TextDelta("a".into()),
                StreamEvent::TextDelta("b".into()),
                StreamEvent::Done,
            ]
        );
    }

    #[tokio::test]
    async fn body_without_done_still_flushes_and_finishes() {
        let line = delta_line("tail");
        let unterminated = line.trim_end().to_string();
        let events = collect(vec![unterminated.into_bytes()]).await;
        assert_eq!(
            events,
            vec![StreamEvent::TextDelta("tail".into()), StreamEvent::Done]
        );
    }

    #[tokio::test]
    async fn body_errors_surface_as_http_errors() {
        let body = futures::stream::iter(vec![
            Ok(delta_line("x").into_bytes()),
            Err(std::io::Error::other("connection reset")),
        ]);
        let events: Vec<_> = decode_events(body).collect().await;
        assert!(matches!(events[0], Ok(StreamEvent::TextDelta(_))));
        assert!(matches!(events[1], Err(Error::Http(_))));
        assert_eq!(events.len(), 2);
    }
}
