//! Drives one streaming completion call and reduces it to a single reply.

use futures::StreamExt;
use tracing::{debug, warn};

use crate::error::CompletionError;
use crate::events::ChatMessage;
use crate::llm::{ChatRequest, CompletionEndpoint};
use crate::prompts::FALLBACK_REPLY;

/// Lifecycle of a single call. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Idle,
    Requesting,
    Streaming,
    Completed,
    Failed,
}

/// Outcome of one call
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Every delta, concatenated in arrival order
    Completed(String),
    /// The call failed; the user sees the fallback text
    Failed(CompletionError),
    /// No client was configured, so nothing was sent
    Unavailable,
}

impl Reply {
    /// Text to append to the conversation as the assistant's turn
    pub fn text(&self) -> Option<&str> {
        match self {
            Reply::Completed(text) => Some(text),
            Reply::Failed(_) => Some(FALLBACK_REPLY),
            Reply::Unavailable => None,
        }
    }

    pub fn error(&self) -> Option<&CompletionError> {
        match self {
            Reply::Failed(error) => Some(error),
            _ => None,
        }
    }

    pub fn final_state(&self) -> CallState {
        match self {
            Reply::Completed(_) => CallState::Completed,
            Reply::Failed(_) => CallState::Failed,
            Reply::Unavailable => CallState::Idle,
        }
    }
}

struct Call {
    state: CallState,
}

impl Call {
    fn new() -> Self {
        Self {
            state: CallState::Idle,
        }
    }

    fn advance(&mut self, next: CallState) {
        debug!(from = ?self.state, to = ?next, "completion call");
        self.state = next;
    }

    fn fail(mut self, error: CompletionError, partial: &str) -> Reply {
        warn!(
            error = %error,
            stage = ?self.state,
            partial_len = partial.len(),
            partial = %partial,
            "completion request failed"
        );
        self.advance(CallState::Failed);
        Reply::Failed(error)
    }
}

/// Turns the transcript into one assistant reply.
///
/// Built without an endpoint when no API key could be found; every call then
/// short-circuits to [`Reply::Unavailable`].
#[derive(Clone)]
pub struct ResponseAccumulator<E> {
    endpoint: Option<E>,
    model: String,
}

impl<E: CompletionEndpoint> ResponseAccumulator<E> {
    pub fn new(endpoint: E, model: impl Into<String>) -> Self {
        Self {
            endpoint: Some(endpoint),
            model: model.into(),
        }
    }

    pub fn disabled(model: impl Into<String>) -> Self {
        Self {
            endpoint: None,
            model: model.into(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.endpoint.is_some()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn respond(&self, messages: &[ChatMessage]) -> Reply {
        self.respond_with(messages, |_| {}).await
    }

    /// Like [`respond`](Self::respond), reporting each delta as it arrives
    pub async fn respond_with<F>(&self, messages: &[ChatMessage], mut on_delta: F) -> Reply
    where
        F: FnMut(&str) + Send,
    {
        let Some(endpoint) = &self.endpoint else {
            debug!("completion client unavailable, skipping request");
            return Reply::Unavailable;
        };

        let mut call = Call::new();
        call.advance(CallState::Requesting);

        let request = ChatRequest::new(self.model.clone(), messages.to_vec());
        let mut stream = match endpoint.stream_chat(request).await {
            Ok(stream) => stream,
            Err(e) => return call.fail(e, ""),
        };

        call.advance(CallState::Streaming);
        let mut text = String::new();
        while let Some(item) = stream.next().await {
            match item {
                Ok(chunk) => {
                    if let Some(delta) = chunk.delta_text() {
                        text.push_str(delta);
                        on_delta(delta);
                    }
                }
                Err(e) => return call.fail(e, &text),
            }
        }

        call.advance(CallState::Completed);
        debug!(len = text.len(), "completion finished");
        Reply::Completed(text)
    }
}
