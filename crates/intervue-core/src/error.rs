use thiserror::Error;

/// Unified error taxonomy for the interview core.
///
/// Per-crate errors (store, broker, ai, agent) convert into this enum at
/// component boundaries; the HTTP layer maps each variant to a status code.
#[derive(Debug, Error)]
pub enum IntervueError {
    /// Malformed or out-of-range input. Caller error.
    #[error("validation error: {0}")]
    Validation(String),

    /// Unknown session, question or other entity. Caller error.
    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    /// Already-answered, already-finalized, not-all-answered. Caller error.
    #[error("conflict: {0}")]
    Conflict(String),

    /// External dependency down or over quota. The core degrades instead of
    /// failing wherever a fallback exists.
    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("request timeout after {ms}ms")]
    Timeout { ms: u64 },

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntervueError {
    /// Short error code string returned to HTTP clients.
    pub fn code(&self) -> &'static str {
        match self {
            IntervueError::Validation(_) => "VALIDATION",
            IntervueError::NotFound { .. } => "NOT_FOUND",
            IntervueError::Conflict(_) => "CONFLICT",
            IntervueError::Unavailable(_) => "UNAVAILABLE",
            IntervueError::Config(_) => "CONFIG_ERROR",
            IntervueError::Database(_) => "DATABASE_ERROR",
            IntervueError::Serialization(_) => "SERIALIZATION_ERROR",
            IntervueError::Io(_) => "IO_ERROR",
            IntervueError::Timeout { .. } => "TIMEOUT",
            IntervueError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, IntervueError>;
