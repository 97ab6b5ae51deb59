use crate::config::Config;
use crate::error::{ClientInitError, CompletionError};
use crate::events::ChatMessage;
use crate::streaming::sse_chunks;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio::time::Duration;

/// Lazy, finite sequence of chunks for one completion call
pub type ChunkStream = BoxStream<'static, Result<ChatCompletionChunk, CompletionError>>;

/// Request body for a streaming chat completion
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            stream: true,
        }
    }
}

/// One streamed `chat.completion.chunk`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: ChunkDelta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatCompletionChunk {
    /// Chunk carrying a single text delta
    pub fn text(delta: impl Into<String>) -> Self {
        Self {
            choices: vec![ChunkChoice {
                delta: ChunkDelta {
                    content: Some(delta.into()),
                },
                finish_reason: None,
            }],
        }
    }

    /// The text delta at `choices[0].delta.content`, if any
    pub fn delta_text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.delta.content.as_deref())
            .filter(|text| !text.is_empty())
    }
}

/// A chat-completion endpoint that streams its answer.
///
/// Implemented by [`MistralClient`] for the hosted API and by scripted
/// endpoints in tests.
pub trait CompletionEndpoint: Clone + Send + Sync + 'static {
    fn stream_chat(
        &self,
        request: ChatRequest,
    ) -> impl Future<Output = Result<ChunkStream, CompletionError>> + Send;
}

/// HTTP client for the Mistral chat completions API
#[derive(Clone)]
pub struct MistralClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl MistralClient {
    pub fn new(config: &Config, api_key: String) -> Result<Self, ClientInitError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ClientInitError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }
}

impl CompletionEndpoint for MistralClient {
    async fn stream_chat(&self, request: ChatRequest) -> Result<ChunkStream, CompletionError> {
        let response = self
            .client
            .post(self.completions_url())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Accept", "text/event-stream")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(sse_chunks(Box::pin(response.bytes_stream())))
    }
}
