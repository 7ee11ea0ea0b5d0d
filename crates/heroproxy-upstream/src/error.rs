use thiserror::Error;

/// Error types for upstream gateway operations.
///
/// All variants mean the same thing to callers: the call failed. The split
/// exists for logging; policy around failures (retries, breakers) is out of
/// scope here.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status: {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("invalid upstream URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl UpstreamError {
    /// Create a new Decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }
}

/// Convenience result type for gateway operations.
pub type Result<T> = std::result::Result<T, UpstreamError>;
