//! Connection lifecycle controller.
//!
//! Drives `CONNECTING → (pairing)? → OPEN → closed` for one client:
//! connects through the [`ProtocolConnector`], forwards pairing tokens,
//! merges and persists every credential delta, reconnects across transient
//! disconnects, and settles exactly once — success, `ExpiredSession`,
//! or `ConnectionTimeout`, whichever wins.
//!
//! One deadline is armed per `run` call and never re-armed across
//! reconnects. Every settlement path releases the live handle with an
//! explicit `close()` first; the reconnect path closes the old handle
//! before dialing again.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{info, warn};

use wagate_auth::{Credential, SessionKeyStore};

use crate::error::{SessionError, SessionResult};
use crate::protocol::{
    ConnectionState, ProtocolConnection, ProtocolConnector, ProtocolEvent, ProtocolHandle,
};

/// Pause between a failed dial and the next attempt, so a hard-down
/// endpoint does not spin the loop until the deadline.
const REDIAL_PAUSE: Duration = Duration::from_millis(500);

/// Lifecycle controller for one client's protocol connection.
///
/// Concurrent `run` calls for the same client identifier are not
/// coordinated here; deployments must ensure at most one active run per
/// client.
pub struct ConnectionController {
    connector: Arc<dyn ProtocolConnector>,
    timeout: Duration,
}

impl ConnectionController {
    /// Create a controller with a per-run global deadline. Pairing-oriented
    /// callers use a longer deadline than send-oriented ones.
    pub fn new(connector: Arc<dyn ProtocolConnector>, timeout: Duration) -> Self {
        Self { connector, timeout }
    }

    /// Run the connection to settlement.
    ///
    /// `on_pairing` fires whenever the collaborator emits a pairing token
    /// (possibly several times across reconnects); a delivery failure is
    /// logged and the run keeps waiting. `on_open` fires once the connection
    /// reaches an authenticated open state; the run settles with success
    /// only after it completes.
    pub async fn run<P, FP, O, FO>(
        &self,
        keys: Arc<SessionKeyStore>,
        mut credential: Credential,
        mut on_pairing: P,
        on_open: O,
    ) -> SessionResult<()>
    where
        P: FnMut(String) -> FP + Send,
        FP: Future<Output = SessionResult<()>> + Send,
        O: FnOnce(Arc<dyn ProtocolHandle>) -> FO + Send,
        FO: Future<Output = SessionResult<()>> + Send,
    {
        let client_id = keys.client_id().to_string();
        let deadline = Instant::now() + self.timeout;
        let mut on_open = Some(on_open);

        loop {
            let version = match self.connector.latest_version().await {
                Ok(v) => v,
                Err(err) => {
                    warn!(client_id, %err, "version fetch failed; redialing");
                    wait_to_redial(deadline).await?;
                    continue;
                }
            };

            let ProtocolConnection { mut events, handle } = match self
                .connector
                .connect(version, credential.clone(), Arc::clone(&keys))
                .await
            {
                Ok(conn) => conn,
                Err(err) => {
                    warn!(client_id, %err, "connection attempt failed; redialing");
                    wait_to_redial(deadline).await?;
                    continue;
                }
            };

            loop {
                tokio::select! {
                    // Deadline first: when the timer and an event are both
                    // ready, timing out wins deterministically.
                    biased;

                    _ = tokio::time::sleep_until(deadline) => {
                        warn!(client_id, "global deadline elapsed; forcing teardown");
                        handle.close().await;
                        return Err(SessionError::ConnectionTimeout);
                    }

                    event = events.recv() => match event {
                        Some(ProtocolEvent::CredentialUpdate(delta)) => {
                            // Merge into the full record before persisting so
                            // consecutive deltas cannot overwrite each other.
                            credential.merge(delta.into_iter().collect());
                            if let Err(err) = keys.save_credential(&credential).await {
                                warn!(client_id, %err, "credential persist failed");
                            }
                        }

                        Some(ProtocolEvent::ConnectionUpdate(update)) => {
                            if let Some(token) = update.pairing_token {
                                info!(client_id, "pairing token received");
                                // Delivery failure is not a lifecycle outcome;
                                // the token may fire again and the deadline
                                // still bounds the run.
                                if let Err(err) = on_pairing(token).await {
                                    warn!(client_id, %err, "pairing token delivery failed");
                                }
                            }

                            match update.state {
                                Some(ConnectionState::Open) => {
                                    info!(client_id, "connection open");
                                    let result = match on_open.take() {
                                        Some(open) => open(Arc::clone(&handle)).await,
                                        None => Ok(()),
                                    };
                                    handle.close().await;
                                    return match result {
                                        Ok(()) => Ok(()),
                                        Err(err) => {
                                            warn!(client_id, %err, "open handler failed");
                                            Err(SessionError::ExpiredSession)
                                        }
                                    };
                                }

                                Some(ConnectionState::Close) => {
                                    if update.disconnect.is_some_and(|r| r.is_logged_out()) {
                                        info!(client_id, "credential invalidated by remote");
                                        handle.close().await;
                                        return Err(SessionError::ExpiredSession);
                                    }
                                    info!(
                                        client_id,
                                        reason = ?update.disconnect,
                                        "connection closed; reconnecting"
                                    );
                                    handle.close().await;
                                    break;
                                }

                                Some(ConnectionState::Connecting) | None => {}
                            }
                        }

                        // Event stream ended without a close notification;
                        // treat it like a transient disconnect.
                        None => {
                            warn!(client_id, "event stream ended; reconnecting");
                            handle.close().await;
                            break;
                        }
                    }
                }
            }
        }
    }
}

/// Pause before redialing, bounded by the global deadline.
async fn wait_to_redial(deadline: Instant) -> SessionResult<()> {
    tokio::select! {
        biased;
        _ = tokio::time::sleep_until(deadline) => Err(SessionError::ConnectionTimeout),
        _ = tokio::time::sleep(REDIAL_PAUSE) => Ok(()),
    }
}

// ── tests ────────────────────────────────────────────────────────────
