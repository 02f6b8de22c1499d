use intervue_core::error::IntervueError;
use thiserror::Error;

/// Errors produced by the session store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested entity does not exist.
    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    /// Write-once or lifecycle conflict (duplicate answer, finalize on a
    /// failed session).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Out-of-range score or malformed data rejected at the storage boundary.
    #[error("validation error: {0}")]
    Validation(String),

    /// A SQLite operation failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<StoreError> for IntervueError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { what, id } => IntervueError::NotFound { what, id },
            StoreError::Conflict(msg) => IntervueError::Conflict(msg),
            StoreError::Validation(msg) => IntervueError::Validation(msg),
            StoreError::Database(e) => IntervueError::Database(e.to_string()),
            StoreError::Serialization(e) => IntervueError::Serialization(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
