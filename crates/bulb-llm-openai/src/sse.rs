//! Line framing for `data: <json>` event streams.
//!
//! Bytes are buffered until a `\n` arrives, so both partial lines and
//! multi-byte characters split across chunks are reassembled before
//! decoding.

const DATA_PREFIX: &str = "data: ";
const DONE_MARKER: &str = "[DONE]";

/// One meaningful line of the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Payload of a `data: ` line, trimmed.
    Data(String),
    /// `data: [DONE]`.
    Done,
}

#[derive(Debug, Default)]
pub struct LineDecoder {
    buf: Vec<u8>,
    done: bool,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `data: [DONE]` has been seen. Later input is ignored.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed a chunk and return the frames of every line it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        if self.done {
            return Vec::new();
        }
        self.buf.extend_from_slice(chunk);

        let mut frames = Vec::new();
        let mut start = 0;
        while let Some(pos) = self.buf[start..].iter().position(|&b| b == b'\n') {
            let end = start + pos;
            let frame = parse_line(&self.buf[start..end]);
            start = end + 1;
            if let Some(frame) = frame {
                let is_done = frame == Frame::Done;
                frames.push(frame);
                if is_done {
                    self.done = true;
                    break;
                }
            }
        }

        if self.done {
            self.buf.clear();
        } else {
            self.buf.drain(..start);
        }
        frames
    }

    /// Flush whatever is still buffered once the body has ended.
    pub fn finish(&mut self) -> Vec<Frame> {
        if self.done || self.buf.is_empty() {
            self.buf.clear();
            return Vec::new();
        }
        let mut rest = std::mem::take(&mut self.buf);
        rest.push(b'\n');
        self.push(&rest)
    }
}

fn parse_line(raw: &[u8]) -> Option<Frame> {
    let line = String::from_utf8_lossy(raw);
    let line = line.strip_suffix('\r').unwrap_or(&line);

    if line.trim().is_empty() || line.starts_with(':') {
        return None;
    }
    let payload = line.strip_prefix(DATA_PREFIX)?.trim();
    if payload == DONE_MARKER {
        return Some(Frame::Done);
    }
    Some(Frame::Data(payload.to_string()))
}
