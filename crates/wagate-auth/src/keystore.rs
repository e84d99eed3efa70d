//! Session key store — the partitioned key space for one client.
//!
//! [`SessionKeyStore::load`] reconstructs the in-memory key cache from the
//! client's document-store partition, separating the credential record from
//! key records and decoding both through the codec. During a session the
//! cache is the source of truth for reads and the write-through target for
//! every set; each set also persists one row per entry, concurrently, with
//! no cross-row transaction.
//!
//! Key rows carry a retention deadline a fixed window ahead; the credential
//! row never does.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use futures::future::try_join_all;
use tracing::{debug, warn};

use wagate_store::{DocumentStore, Payload, SessionRow};

use crate::category::{self, CREDS_LABEL};
use crate::codec;
use crate::creds::Credential;
use crate::error::AuthResult;
use crate::value::AuthValue;

/// `category → (key-id → value)`, the shape of a set-keys batch.
pub type KeyUpdates = HashMap<String, HashMap<String, AuthValue>>;

/// Result of loading a client's session state.
pub struct LoadedSession {
    /// The key store, cache warmed from the client's partition.
    pub keys: SessionKeyStore,
    /// Decoded credential record, or a fresh empty one.
    pub credential: Credential,
    /// True iff the credential carries a non-empty identity marker.
    pub has_valid_session: bool,
}

/// Write-through key cache over the document store for a single client.
pub struct SessionKeyStore {
    store: Arc<dyn DocumentStore>,
    client_id: String,
    retention: Duration,
    cache: Mutex<KeyUpdates>,
}

impl SessionKeyStore {
    /// Query the client's partition and rebuild credential + key cache.
    ///
    /// A key row that fails to decode is skipped (treated absent) — one
    /// malformed row must not abort the whole load. A credential row that
    /// fails to decode downgrades the session to unauthenticated instead.
    pub async fn load(
        store: Arc<dyn DocumentStore>,
        client_id: &str,
        retention: Duration,
    ) -> AuthResult<LoadedSession> {
        let rows = store.query_rows(client_id).await?;

        let mut credential = None;
        let mut cache: KeyUpdates = HashMap::new();

        for row in rows {
            if row.data_type == CREDS_LABEL {
                credential = decode_credential(&row);
                continue;
            }

            let (cat, id) = category::split_label(&row.data_type);
            match codec::decode(&row.payload) {
                Ok(value) => {
                    cache
                        .entry(cat.to_string())
                        .or_default()
                        .insert(id.to_string(), value);
                }
                Err(err) => {
                    warn!(
                        client_id,
                        data_type = %row.data_type,
                        %err,
                        "skipping undecodable key row"
                    );
                }
            }
        }

        let credential = credential.unwrap_or_default();
        let has_valid_session = credential.is_authenticated();

        debug!(
            client_id,
            categories = cache.len(),
            has_valid_session,
            "session state loaded"
        );

        Ok(LoadedSession {
            keys: SessionKeyStore {
                store,
                client_id: client_id.to_string(),
                retention,
                cache: Mutex::new(cache),
            },
            credential,
            has_valid_session,
        })
    }

    /// The client this store is partitioned under.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Fetch cached values for the given ids within one category.
    ///
    /// Absent ids are omitted from the result; asking for a key that was
    /// never written is not an error.
    pub fn get_keys(&self, category: &str, ids: &[String]) -> HashMap<String, AuthValue> {
        // A poisoned lock still guards a coherent map; recover it.
        let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(bucket) = cache.get(category) else {
            return HashMap::new();
        };
        ids.iter()
            .filter_map(|id| bucket.get(id).map(|v| (id.clone(), v.clone())))
            .collect()
    }

    /// Apply a batch of key updates: cache first, then one persist per
    /// entry, dispatched concurrently.
    ///
    /// Reads in this process observe the update before the writes land.
    /// There is no cross-row transaction; each row is independently
    /// resumable, so a crash between two writes leaves the store behind for
    /// at most those rows.
    pub async fn set_keys(&self, updates: KeyUpdates) -> AuthResult<()> {
        let now_millis = Utc::now().timestamp_millis();
        let ttl = Utc::now().timestamp() + self.retention.as_secs() as i64;

        let mut rows = Vec::new();
        {
            let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
            for (cat, entries) in updates {
                for (id, value) in entries {
                    let encoded = codec::encode(&value);
                    cache
                        .entry(cat.clone())
                        .or_default()
                        .insert(id.clone(), value);

                    rows.push(SessionRow {
                        client_id: self.client_id.clone(),
                        data_type: category::join_label(&cat, &id),
                        payload: Payload::Json(encoded),
                        updated_at: now_millis,
                        ttl: Some(ttl),
                    });
                }
            }
        }

        let count = rows.len();
        try_join_all(rows.into_iter().map(|row| self.store.put_row(row))).await?;
        debug!(client_id = %self.client_id, rows = count, "key batch persisted");
        Ok(())
    }

    /// Persist the full accumulated credential record.
    ///
    /// The caller merges deltas into the record before calling; this method
    /// never writes a partial update. The row is stored as an opaque string
    /// and never carries a retention deadline.
    pub async fn save_credential(&self, credential: &Credential) -> AuthResult<()> {
        let row = SessionRow {
            client_id: self.client_id.clone(),
            data_type: CREDS_LABEL.to_string(),
            payload: Payload::Text(codec::encode_to_string(&credential.to_value())),
            updated_at: Utc::now().timestamp_millis(),
            ttl: None,
        };
        self.store.put_row(row).await?;
        debug!(client_id = %self.client_id, "credential persisted");
        Ok(())
    }
}

/// Decode the credential row, falling back to "no credential" on failure.
fn decode_credential(row: &SessionRow) -> Option<Credential> {
    let value = match codec::decode(&row.payload) {
        Ok(v) => v,
        Err(err) => {
            warn!(client_id = %row.client_id, %err, "credential row failed to decode; treating session as unauthenticated");
            return None;
        }
    };
    match Credential::from_value(value) {
        Ok(creds) => Some(creds),
        Err(err) => {
            warn!(client_id = %row.client_id, %err, "credential row is not a record; treating session as unauthenticated");
            None
        }
    }
}

// ── tests ────────────────────────────────────────────────────────────
