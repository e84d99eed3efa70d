//! Protocol collaborator seam.
//!
//! The real connection — wire framing, noise handshake, pairing-code
//! emission, message encryption — lives behind [`ProtocolConnector`]. The
//! controller only needs three things from it: open a credentialed
//! connection, receive lifecycle/credential events in generation order, and
//! issue operations on the live handle.
//!
//! Events are delivered over an `mpsc` channel rather than registered
//! callbacks so the controller's select loop owns all ordering decisions.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use wagate_auth::{AuthValue, Credential, SessionKeyStore};

/// Failure inside the protocol collaborator.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ProtocolError(pub String);

/// Protocol wire version negotiated at connect time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolVersion(pub [u32; 3]);

/// Why the collaborator reported a closed connection.
///
/// Only [`DisconnectReason::LoggedOut`] is terminal: it means the remote
/// side invalidated the credential, and retrying would loop forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    LoggedOut,
    RestartRequired,
    ConnectionLost,
    ConnectionClosed,
    StreamError,
    Other(u16),
}

impl DisconnectReason {
    /// True when the credential was explicitly invalidated.
    pub fn is_logged_out(&self) -> bool {
        matches!(self, DisconnectReason::LoggedOut)
    }
}

/// Connection phase reported in a connection update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Close,
}

/// One `connection.update` notification from the collaborator.
#[derive(Debug, Clone, Default)]
pub struct ConnectionUpdate {
    /// New connection phase, if it changed.
    pub state: Option<ConnectionState>,
    /// Pairing token to present to the end user. Emitted when no valid
    /// credential exists yet; may fire multiple times across reconnects.
    pub pairing_token: Option<String>,
    /// Close reason, present alongside `state == Close`.
    pub disconnect: Option<DisconnectReason>,
}

/// Partial credential fields emitted by the collaborator.
pub type CredentialDelta = BTreeMap<String, AuthValue>;

/// Event stream element.
#[derive(Debug, Clone)]
pub enum ProtocolEvent {
    /// Partial credential update; the receiver merges it into the full
    /// in-memory record before persisting.
    CredentialUpdate(CredentialDelta),
    /// Lifecycle notification.
    ConnectionUpdate(ConnectionUpdate),
}

/// Presence states the protocol can broadcast to a chat peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceState {
    Composing,
    Paused,
}

/// Acknowledgement for a sent message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    /// Protocol-assigned message id.
    pub id: String,
}

/// Operations available on a live, authenticated connection.
#[async_trait]
pub trait ProtocolHandle: Send + Sync {
    /// Subscribe to a peer's presence updates.
    async fn presence_subscribe(&self, target: &str) -> Result<(), ProtocolError>;

    /// Broadcast our presence state to a peer.
    async fn send_presence(&self, state: PresenceState, target: &str) -> Result<(), ProtocolError>;

    /// Send a text message.
    async fn send_message(&self, target: &str, text: &str) -> Result<SentMessage, ProtocolError>;

    /// Tear the connection down. The controller calls this exactly once per
    /// handle, on every settlement path and before each reconnect.
    async fn close(&self);
}

/// A freshly connected protocol session: the event stream plus the
/// operation handle.
pub struct ProtocolConnection {
    pub events: mpsc::Receiver<ProtocolEvent>,
    pub handle: Arc<dyn ProtocolHandle>,
}

/// Factory for protocol connections.
#[async_trait]
pub trait ProtocolConnector: Send + Sync {
    /// Latest supported wire version.
    async fn latest_version(&self) -> Result<ProtocolVersion, ProtocolError>;

    /// Open a connection using the given credential, with `keys` as the
    /// provider for the protocol's auxiliary key material.
    async fn connect(
        &self,
        version: ProtocolVersion,
        credential: Credential,
        keys: Arc<SessionKeyStore>,
    ) -> Result<ProtocolConnection, ProtocolError>;
}
