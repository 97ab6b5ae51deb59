//! Server-Sent Events decoding for streamed chat completions.

use crate::error::CompletionError;
use crate::llm::{ChatCompletionChunk, ChunkStream};
use futures::{Stream, StreamExt};
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt::Display;

/// A decoded `data:` frame
#[derive(Debug, Clone, PartialEq)]
pub enum SseFrame {
    Data(String),
    Done,
}

/// Incremental line splitter for an SSE body.
///
/// Bytes are buffered until a full line is available, so a multi-byte
/// character split across network reads is decoded intact.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    done: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes, returning every complete frame they finish
    pub fn push(&mut self, bytes: &[u8]) -> Vec<SseFrame> {
        if self.done {
            return Vec::new();
        }
        self.buffer.extend_from_slice(bytes);

        let mut frames = Vec::new();
        while let Some(newline_pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            if let Some(frame) = self.decode_line(&line) {
                frames.push(frame);
                if self.done {
                    self.buffer.clear();
                    break;
                }
            }
        }
        frames
    }

    /// Flush a trailing line that arrived without a newline
    pub fn finish(&mut self) -> Option<SseFrame> {
        if self.done || self.buffer.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.buffer);
        self.decode_line(&line)
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    fn decode_line(&mut self, raw: &[u8]) -> Option<SseFrame> {
        let line = String::from_utf8_lossy(raw);
        let line = line.trim();

        // blank lines separate events, ':' starts a comment
        let data = line.strip_prefix("data:")?.trim_start();
        if data == "[DONE]" {
            self.done = true;
            return Some(SseFrame::Done);
        }
        Some(SseFrame::Data(data.to_string()))
    }
}

/// Parse one `data:` payload into a completion chunk.
///
/// An error object sent in place of a chunk (`{"error": ...}` or
/// `{"object": "error", ...}`) becomes [`CompletionError::Stream`].
pub fn parse_chunk(data: &str) -> Result<ChatCompletionChunk, CompletionError> {
    let malformed = |e: serde_json::Error| CompletionError::Malformed(format!("{}: {}", e, data));

    let value: Value = serde_json::from_str(data).map_err(malformed)?;
    if let Some(message) = endpoint_error(&value) {
        return Err(CompletionError::Stream(format!("endpoint error: {}", message)));
    }
    serde_json::from_value(value).map_err(malformed)
}

fn endpoint_error(value: &Value) -> Option<String> {
    let error = value.get("error").filter(|e| !e.is_null());
    let is_error_object = value.get("object").and_then(Value::as_str) == Some("error");
    if error.is_none() && !is_error_object {
        return None;
    }

    let message = error
        .and_then(|e| e.get("message").and_then(Value::as_str).or_else(|| e.as_str()))
        .or_else(|| value.get("message").and_then(Value::as_str))
        .unwrap_or("unknown error");
    Some(message.to_string())
}

struct DecodeState<S> {
    body: S,
    decoder: SseDecoder,
    pending: VecDeque<Result<ChatCompletionChunk, CompletionError>>,
    finished: bool,
}

impl<S> DecodeState<S> {
    fn queue(&mut self, frame: SseFrame) {
        match frame {
            SseFrame::Data(data) => self.pending.push_back(parse_chunk(&data)),
            SseFrame::Done => self.finished = true,
        }
    }
}

/// Turn a raw SSE byte stream into a lazy stream of completion chunks.
///
/// The stream ends at `[DONE]` or when the body closes. A transport error
/// or an unparseable payload is yielded as `Err` and ends the stream.
pub fn sse_chunks<S, B, E>(body: S) -> ChunkStream
where
    S: Stream<Item = Result<B, E>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = DecodeState {
        body,
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                if item.is_err() {
                    state.pending.clear();
                    state.finished = true;
                }
                return Some((item, state));
            }
            if state.finished {
                return None;
            }

            match state.body.next().await {
                Some(Ok(bytes)) => {
                    for frame in state.decoder.push(bytes.as_ref()) {
                        state.queue(frame);
                    }
                }
                Some(Err(e)) => {
                    state.finished = true;
                    state
                        .pending
                        .push_back(Err(CompletionError::Stream(e.to_string())));
                }
                None => {
                    if let Some(frame) = state.decoder.finish() {
                        state.queue(frame);
                    }
                    state.finished = true;
                }
            }
        }
    })
    .boxed()
}
