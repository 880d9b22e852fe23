use thiserror::Error;

/// Error types that can occur when talking to an LLM or agent backend.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LlmError {
    /// The backend answered with a non-success status or an error payload.
    #[error("provider error: {0}")]
    Provider(String),

    /// Transport-level failure (connect, TLS, timeout).
    #[error("HTTP error: {0}")]
    Http(String),

    /// The response body did not match the expected shape.
    #[error("response format error: {message}. Raw response: '{raw_response}'")]
    ResponseFormat {
        message: String,
        raw_response: String,
    },

    /// JSON serialization and deserialization errors.
    #[error("JSON error")]
    Json(#[from] serde_json::Error),

    /// Errors from building endpoint URLs.
    #[error("invalid URL")]
    InvalidUrl(#[from] url::ParseError),

    /// Standard I/O errors.
    #[error("I/O error")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::Http(err.to_string())
    }
}
