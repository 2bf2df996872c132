use thiserror::Error;

/// Everything the fetch and summarize paths can fail with.
#[derive(Error, Debug)]
pub enum RecapError {
    /// 401 from the chat API.
    #[error("invalid credentials")]
    Auth,

    /// 403 from the chat API.
    #[error("access denied for this channel")]
    Permission,

    /// 404 from the chat API.
    #[error("channel does not exist")]
    NotFound,

    /// Any other non-2xx. A 429 only lands here once the retries are spent:
    /// while retrying it travels as [`crate::history::FetchOutcome::RateLimited`].
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("no messages to summarize")]
    EmptyInput,

    #[error("summarization API token is required")]
    MissingToken,

    #[error("invalid response format from completion endpoint")]
    MalformedResponse,

    #[error("invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Failures from the storage port (application layer only).
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl RecapError {
    /// Status-code error with the generic message the APIs fall back to.
    pub fn http_status(status: u16) -> Self {
        RecapError::Http {
            status,
            message: format!("HTTP error! status: {}", status),
        }
    }
}

pub type RecapResult<T> = Result<T, RecapError>;
