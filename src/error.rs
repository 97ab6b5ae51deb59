//! Error types for client setup, credentials and completion calls.

/// Errors raised while looking up the API key.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("no credential found (tried: {tried})")]
    NoCredentialFound { tried: String },

    #[error("{provider}: {message}")]
    Provider { provider: String, message: String },
}

/// Errors that leave the response accumulator disabled for the session.
#[derive(Debug, thiserror::Error)]
pub enum ClientInitError {
    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Failures during a single streaming completion call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompletionError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("stream interrupted: {0}")]
    Stream(String),

    #[error("malformed chunk: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for CompletionError {
    fn from(err: reqwest::Error) -> Self {
        CompletionError::Request(err.to_string())
    }
}
