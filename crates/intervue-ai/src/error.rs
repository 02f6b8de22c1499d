use intervue_core::error::IntervueError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("request timeout after {ms}ms")]
    Timeout { ms: u64 },
}

impl From<AiError> for IntervueError {
    fn from(e: AiError) -> Self {
        match e {
            AiError::Timeout { ms } => IntervueError::Timeout { ms },
            other => IntervueError::Unavailable(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, AiError>;
