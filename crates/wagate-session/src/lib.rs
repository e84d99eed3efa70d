//! # wagate-session
//!
//! Connection lifecycle for a single messaging session.
//!
//! The [`ConnectionController`](controller::ConnectionController) drives one
//! connect → pair/open → close cycle against the protocol collaborator,
//! reconnecting across transient disconnects, persisting every credential
//! delta through the key store, and settling exactly once with success or a
//! classified failure.
//!
//! The protocol connection itself (framing, encryption, pairing-code
//! emission) is consumed as a black box behind the
//! [`ProtocolConnector`](protocol::ProtocolConnector) seam; events arrive
//! over a channel in generation order.

pub mod controller;
pub mod error;
pub mod gateway;
pub mod protocol;
pub mod push;
pub mod send;

// ── re-exports ───────────────────────────────────────────────────────

pub use controller::ConnectionController;
pub use error::{SessionError, SessionResult};
pub use gateway::{GatewayTimeouts, SendOutcome, SessionGateway, StartOutcome};
pub use protocol::{
    ConnectionState, ConnectionUpdate, DisconnectReason, ProtocolConnection, ProtocolConnector,
    ProtocolError, ProtocolEvent, ProtocolHandle, ProtocolVersion, SentMessage,
};
pub use push::PushChannel;
