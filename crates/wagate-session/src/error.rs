//! Error taxonomy for the session layer.
//!
//! The lifecycle controller is the only place that turns protocol-level
//! failures into classified outcomes: its callers see success,
//! [`SessionError::ExpiredSession`], or [`SessionError::ConnectionTimeout`]
//! and nothing else. Store and decode errors can additionally escape from
//! calls made outside the controller's loop (loading state, gateway
//! lookups).

use thiserror::Error;
use wagate_auth::AuthError;
use wagate_store::StoreError;

use crate::protocol::ProtocolError;

/// Alias for `Result<T, SessionError>`.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors surfaced by the session layer.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The remote side explicitly invalidated the credential (logged out).
    /// Not retryable; the client must re-pair.
    #[error("session expired; pairing is required again")]
    ExpiredSession,

    /// The global deadline elapsed before an open, authenticated state was
    /// reached. Retryable on a fresh invocation.
    #[error("connection timeout")]
    ConnectionTimeout,

    /// Document-store failure, propagated unchanged.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Credential/key layer failure, propagated unchanged.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The user has no active real-time channel connection to deliver
    /// pairing tokens to.
    #[error("no active channel connection for user `{0}`")]
    NoChannel(String),

    /// Pairing-token delivery to the real-time channel failed.
    #[error("pairing token delivery failed: {0}")]
    PushDelivery(String),

    /// A protocol operation on an open connection failed.
    #[error("protocol operation failed: {0}")]
    Protocol(#[from] ProtocolError),
}
