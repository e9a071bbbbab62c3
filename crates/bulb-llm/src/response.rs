use crate::error::Error;
use crate::stream::StreamEvent;
use futures::Stream;
use std::pin::Pin;
use tokio_stream::StreamExt;

/// A live streaming chat response.
///
/// Consume it event-by-event via [`events()`](Response::events), or collect
/// the full text with [`into_text()`](Response::into_text). Dropping it
/// aborts the underlying request.
pub struct Response {
    inner: Pin<Box<dyn Stream<Item = Result<StreamEvent, Error>> + Send>>,
}

impl Response {
    pub fn new(stream: impl Stream<Item = Result<StreamEvent, Error>> + Send + 'static) -> Self {
        Self {
            inner: Box::pin(stream),
        }
    }

    /// Consume the response as an async stream of events.
    pub fn events(self) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, Error>> + Send>> {
        self.inner
    }

    /// Collect all text deltas up to `Done` or the end of the stream.
    pub async fn into_text(self) -> Result<String, Error> {
        let mut text = String::new();
        let mut stream = self.inner;
        while let Some(event) = stream.next().await {
            match event? {
                StreamEvent::TextDelta(delta) => text.push_str(&delta),
                StreamEvent::Done => break,
            }
        }
        Ok(text)
    }
}
