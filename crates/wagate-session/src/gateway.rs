//! Session gateway — the request-level orchestration.
//!
//! Ties the pieces together for the two entry points: starting (pairing) a
//! session and sending a message over an existing one. The user identifier
//! doubles as the client identifier partitioning the stored session rows.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tracing::{info, instrument};

use wagate_auth::SessionKeyStore;
use wagate_store::{ChannelRegistry, DocumentStore};

use crate::controller::ConnectionController;
use crate::error::{SessionError, SessionResult};
use crate::protocol::ProtocolConnector;
use crate::push::PushChannel;
use crate::send;

/// Global connection deadlines per use case.
///
/// The two values are intentionally distinct: pairing flows wait on a human
/// scanning a token, send flows only on the handshake.
#[derive(Debug, Clone, Copy)]
pub struct GatewayTimeouts {
    pub pairing: Duration,
    pub send: Duration,
}

impl Default for GatewayTimeouts {
    fn default() -> Self {
        Self {
            pairing: Duration::from_secs(60),
            send: Duration::from_secs(25),
        }
    }
}

/// Result of a start-session request.
#[derive(Debug, PartialEq, Eq)]
pub enum StartOutcome {
    /// A valid session already exists; nothing to pair.
    AlreadyActive { connection_id: String },
    /// Pairing completed and the session is now authenticated.
    Paired { connection_id: String },
}

/// Result of a send-message request.
#[derive(Debug, PartialEq, Eq)]
pub enum SendOutcome {
    /// No authenticated session exists; the message was not sent.
    NoSession,
    /// The message went out.
    Sent { message_id: String },
}

/// Request-level facade over store, channel registry, push delivery and
/// the connection controller.
pub struct SessionGateway {
    store: Arc<dyn DocumentStore>,
    channels: ChannelRegistry,
    push: PushChannel,
    connector: Arc<dyn ProtocolConnector>,
    retention: Duration,
    timeouts: GatewayTimeouts,
}

impl SessionGateway {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        channels: ChannelRegistry,
        push: PushChannel,
        connector: Arc<dyn ProtocolConnector>,
        retention: Duration,
        timeouts: GatewayTimeouts,
    ) -> Self {
        Self {
            store,
            channels,
            push,
            connector,
            retention,
            timeouts,
        }
    }

    /// Start (pair) a session for `user_id`.
    ///
    /// Pairing tokens are pushed to the user's active real-time channel
    /// connection; without one there is nowhere to deliver them, so the
    /// request fails up front.
    #[instrument(skip(self))]
    pub async fn start_session(&self, user_id: &str) -> SessionResult<StartOutcome> {
        let connection_id = self
            .channels
            .connection_for_user(user_id)
            .await?
            .ok_or_else(|| SessionError::NoChannel(user_id.to_string()))?;

        let loaded =
            SessionKeyStore::load(Arc::clone(&self.store), user_id, self.retention).await?;
        if loaded.has_valid_session {
            info!(user_id, "session already started");
            return Ok(StartOutcome::AlreadyActive { connection_id });
        }

        let keys = Arc::new(loaded.keys);
        let push = self.push.clone();
        let push_target = connection_id.clone();

        let controller =
            ConnectionController::new(Arc::clone(&self.connector), self.timeouts.pairing);
        controller
            .run(
                keys,
                loaded.credential,
                move |token| {
                    let push = push.clone();
                    let push_target = push_target.clone();
                    async move { push.post(&push_target, &token).await }
                },
                |_handle| async { Ok::<(), SessionError>(()) },
            )
            .await?;

        info!(user_id, "session paired");
        Ok(StartOutcome::Paired { connection_id })
    }

    /// Send a text message on `user_id`'s session.
    #[instrument(skip(self, text))]
    pub async fn send_message(
        &self,
        user_id: &str,
        target: &str,
        text: &str,
    ) -> SessionResult<SendOutcome> {
        let loaded =
            SessionKeyStore::load(Arc::clone(&self.store), user_id, self.retention).await?;
        if !loaded.has_valid_session {
            info!(user_id, "session not started; refusing to send");
            return Ok(SendOutcome::NoSession);
        }

        let keys = Arc::new(loaded.keys);
        let message_id = Arc::new(Mutex::new(None));
        let id_slot = Arc::clone(&message_id);
        let target = target.to_string();
        let text = text.to_string();

        let controller =
            ConnectionController::new(Arc::clone(&self.connector), self.timeouts.send);
        controller
            .run(
                keys,
                loaded.credential,
                // A valid session should not be asked to pair again; if the
                // collaborator emits a token anyway, there is no channel
                // waiting for it.
                |_token| async { Ok::<(), SessionError>(()) },
                move |handle| async move {
                    let sent = send::send_text(&handle, &target, &text).await?;
                    *id_slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(sent.id);
                    Ok(())
                },
            )
            .await?;

        let id = message_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .unwrap_or_default();
        Ok(SendOutcome::Sent { message_id: id })
    }
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio::sync::mpsc;

    use wagate_auth::{AuthValue, Credential};
    use wagate_store::{Database, SqliteDocumentStore};

    use crate::protocol::{
        ConnectionState, ConnectionUpdate, PresenceState, ProtocolConnection, ProtocolError,
        ProtocolEvent, ProtocolHandle, ProtocolVersion, SentMessage,
    };

    const RETENTION: Duration = Duration::from_secs(90 * 24 * 3600);

    #[derive(Default)]
    struct GwHandle {
        sent: Mutex<Vec<(String, String)>>,
        closes: AtomicUsize,
    }

    #[async_trait]
    impl ProtocolHandle for GwHandle {
        async fn presence_subscribe(&self, _target: &str) -> Result<(), ProtocolError> {
            Ok(())
        }
        async fn send_presence(
            &self,
            _state: PresenceState,
            _target: &str,
        ) -> Result<(), ProtocolError> {
            Ok(())
        }
        async fn send_message(
            &self,
            target: &str,
            text: &str,
        ) -> Result<SentMessage, ProtocolError> {
            self.sent
                .lock()
                .unwrap()
                .push((target.to_string(), text.to_string()));
            Ok(SentMessage { id: "MSG-9".into() })
        }
        async fn close(&self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Connector whose every attempt opens immediately.
    struct OpenConnector {
        handle: Arc<GwHandle>,
        connects: AtomicUsize,
        held_senders: Mutex<Vec<mpsc::Sender<ProtocolEvent>>>,
    }

    impl OpenConnector {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                handle: Arc::new(GwHandle::default()),
                connects: AtomicUsize::new(0),
                held_senders: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ProtocolConnector for OpenConnector {
        async fn latest_version(&self) -> Result<ProtocolVersion, ProtocolError> {
            Ok(ProtocolVersion([2, 3000, 0]))
        }

        async fn connect(
            &self,
            _version: ProtocolVersion,
            _credential: Credential,
            _keys: Arc<SessionKeyStore>,
        ) -> Result<ProtocolConnection, ProtocolError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            let (tx, rx) = mpsc::channel(1);
            tx.try_send(ProtocolEvent::ConnectionUpdate(ConnectionUpdate {
                state: Some(ConnectionState::Open),
                ..Default::default()
            }))
            .unwrap();
            self.held_senders.lock().unwrap().push(tx);
            Ok(ProtocolConnection {
                events: rx,
                handle: Arc::clone(&self.handle) as Arc<dyn ProtocolHandle>,
            })
        }
    }

    struct Fixture {
        gateway: SessionGateway,
        db: Database,
        store: Arc<dyn DocumentStore>,
        connector: Arc<OpenConnector>,
    }

    async fn fixture() -> Fixture {
        let db = Database::open_in_memory().unwrap();
        db.run_migrations().await.unwrap();
        let store: Arc<dyn DocumentStore> = Arc::new(SqliteDocumentStore::new(db.clone()));
        let connector = OpenConnector::new();
        let gateway = SessionGateway::new(
            Arc::clone(&store),
            ChannelRegistry::new(db.clone()),
            PushChannel::new("http://127.0.0.1:9/").unwrap(),
            connector.clone(),
            RETENTION,
            GatewayTimeouts::default(),
        );
        Fixture {
            gateway,
            db,
            store,
            connector,
        }
    }

    async fn register_channel(db: &Database, user_id: &str, connection_id: &str) {
        let user_id = user_id.to_string();
        let connection_id = connection_id.to_string();
        db.execute(move |conn| {
            conn.execute(
                "INSERT INTO channel_connections (connection_id, user_id, connected_at) \
                 VALUES (?1, ?2, 1)",
                rusqlite::params![connection_id, user_id],
            )?;
            Ok(())
        })
        .await
        .unwrap();
    }

    async fn seed_authenticated_creds(store: &Arc<dyn DocumentStore>, user_id: &str) {
        let loaded = SessionKeyStore::load(Arc::clone(store), user_id, RETENTION)
            .await
            .unwrap();
        let mut creds = Credential::init();
        creds.set("me", AuthValue::object([("id", AuthValue::from("123@host"))]));
        loaded.keys.save_credential(&creds).await.unwrap();
    }

    #[tokio::test]
    async fn start_session_without_channel_fails() {
        let fx = fixture().await;
        let result = fx.gateway.start_session("user-a").await;
        assert!(matches!(result, Err(SessionError::NoChannel(_))));
        assert_eq!(fx.connector.connects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn start_session_short_circuits_when_already_active() {
        let fx = fixture().await;
        register_channel(&fx.db, "user-a", "conn-1").await;
        seed_authenticated_creds(&fx.store, "user-a").await;

        let outcome = fx.gateway.start_session("user-a").await.unwrap();
        assert_eq!(
            outcome,
            StartOutcome::AlreadyActive {
                connection_id: "conn-1".into()
            }
        );
        assert_eq!(fx.connector.connects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn start_session_pairs_a_fresh_client() {
        let fx = fixture().await;
        register_channel(&fx.db, "user-a", "conn-1").await;

        let outcome = fx.gateway.start_session("user-a").await.unwrap();
        assert_eq!(
            outcome,
            StartOutcome::Paired {
                connection_id: "conn-1".into()
            }
        );
        assert_eq!(fx.connector.connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn send_without_session_is_refused_without_dialing() {
        let fx = fixture().await;
        let outcome = fx
            .gateway
            .send_message("user-a", "+123", "hello")
            .await
            .unwrap();
        assert_eq!(outcome, SendOutcome::NoSession);
        assert_eq!(fx.connector.connects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn send_with_valid_session_delivers() {
        let fx = fixture().await;
        seed_authenticated_creds(&fx.store, "user-a").await;

        let outcome = fx
            .gateway
            .send_message("user-a", "+123", "hello")
            .await
            .unwrap();
        assert_eq!(
            outcome,
            SendOutcome::Sent {
                message_id: "MSG-9".into()
            }
        );
        assert_eq!(
            *fx.connector.handle.sent.lock().unwrap(),
            vec![("123@s.whatsapp.net".to_string(), "hello".to_string())]
        );
        assert_eq!(fx.connector.handle.closes.load(Ordering::SeqCst), 1);
    }
}
