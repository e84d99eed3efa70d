//! Error types for the wagate-auth crate.

use thiserror::Error;
use wagate_store::StoreError;

/// Alias for `Result<T, AuthError>`.
pub type AuthResult<T> = Result<T, AuthError>;

/// Errors surfaced by the credential/key layer.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A stored payload could not be decoded back into a value.
    ///
    /// For key records the caller treats this as "value absent"; only a
    /// credential record failing to decode affects session validity.
    #[error("payload decode failed: {0}")]
    Decode(String),

    /// Underlying document-store operation failed. Propagated unchanged.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<serde_json::Error> for AuthError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
