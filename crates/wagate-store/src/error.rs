//! Error types for the wagate-store crate.
//!
//! All storage operations return [`StoreError`] via [`StoreResult`].
//! Store-level failures propagate to the caller unchanged; nothing in this
//! crate retries internally.

use thiserror::Error;

/// Alias for `Result<T, StoreError>`.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite operation failed.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A schema migration failed.
    #[error("migration v{version} failed: {message}")]
    Migration { version: u32, message: String },

    /// A row carried a payload form the store does not recognize.
    #[error("invalid payload form `{form}` on row {client_id}/{data_type}")]
    InvalidPayloadForm {
        client_id: String,
        data_type: String,
        form: String,
    },

    /// A blocking task was cancelled or panicked.
    #[error("background task failed: {0}")]
    TaskJoin(String),
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::TaskJoin(err.to_string())
    }
}
