//! Message send flow on an open connection.
//!
//! Mimics a human sender: subscribe to the peer's presence, show
//! "composing" for a few seconds, pause, then send.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::error::SessionResult;
use crate::protocol::{PresenceState, ProtocolHandle, SentMessage};

/// How long the "composing" indicator stays up before the message goes out.
const COMPOSING_DELAY: Duration = Duration::from_millis(4000);

/// Suffix of a direct-chat protocol address.
const USER_ADDRESS_DOMAIN: &str = "s.whatsapp.net";

/// Turn a phone-number-like target into a protocol address, dropping a
/// leading `+`.
pub fn protocol_address(target: &str) -> String {
    let digits = target.strip_prefix('+').unwrap_or(target);
    format!("{digits}@{USER_ADDRESS_DOMAIN}")
}

/// Send a text message to `target` over an open connection.
pub async fn send_text(
    handle: &Arc<dyn ProtocolHandle>,
    target: &str,
    text: &str,
) -> SessionResult<SentMessage> {
    let address = protocol_address(target);

    handle.presence_subscribe(&address).await?;
    handle
        .send_presence(PresenceState::Composing, &address)
        .await?;
    tokio::time::sleep(COMPOSING_DELAY).await;
    handle.send_presence(PresenceState::Paused, &address).await?;

    let sent = handle.send_message(&address, text).await?;
    info!(target, id = %sent.id, "message sent");
    Ok(sent)
}

// ── tests ────────────────────────────────────────────────────────────
