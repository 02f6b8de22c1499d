use intervue_core::error::IntervueError;
use thiserror::Error;

/// Errors from the transport broker adapter.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// No broker credentials configured. Non-fatal: the session proceeds in
    /// text-only mode.
    #[error("transport broker is not configured")]
    Unconfigured,

    #[error("token minting failed: {0}")]
    Token(String),

    #[error("room connection failed: {0}")]
    Connect(String),

    #[error("broker protocol error: {0}")]
    Protocol(String),

    /// The room connection has closed.
    #[error("room connection closed")]
    Closed,
}

impl From<BrokerError> for IntervueError {
    fn from(e: BrokerError) -> Self {
        match e {
            BrokerError::Unconfigured => {
                IntervueError::Unavailable("video unavailable: broker not configured".into())
            }
            BrokerError::Token(msg) | BrokerError::Connect(msg) => {
                IntervueError::Unavailable(format!("video unavailable: {msg}"))
            }
            BrokerError::Protocol(msg) => IntervueError::Internal(msg),
            BrokerError::Closed => IntervueError::Unavailable("room connection closed".into()),
        }
    }
}

pub type Result<T> = std::result::Result<T, BrokerError>;
