//! Composite-key document store for session state.
//!
//! One row per (client identifier, data-type label). The payload column
//! holds either a pre-serialized JSON string (`text` form, written by the
//! migration tool for credential rows) or a structured JSON document
//! (`json` form, written by the live connection path for key rows). Readers
//! must tolerate both forms on any row; [`Payload`] keeps the distinction
//! explicit so the key codec can normalize at a single point.

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::db::Database;
use crate::error::{StoreError, StoreResult};

// ═══════════════════════════════════════════════════════════════════════
//  Types
// ═══════════════════════════════════════════════════════════════════════

/// A stored payload in one of its two write-time forms.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// An opaque pre-serialized JSON string.
    Text(String),
    /// A structured JSON document.
    Json(serde_json::Value),
}

impl Payload {
    /// Column discriminator for this form.
    pub fn form(&self) -> &'static str {
        match self {
            Payload::Text(_) => "text",
            Payload::Json(_) => "json",
        }
    }

    /// Serialize to the payload column text.
    pub fn to_column(&self) -> StoreResult<String> {
        match self {
            Payload::Text(s) => Ok(s.clone()),
            Payload::Json(v) => Ok(serde_json::to_string(v)?),
        }
    }

    /// Rebuild from the payload column text and its form discriminator.
    pub fn from_column(
        client_id: &str,
        data_type: &str,
        form: &str,
        raw: String,
    ) -> StoreResult<Self> {
        match form {
            "text" => Ok(Payload::Text(raw)),
            "json" => Ok(Payload::Json(serde_json::from_str(&raw)?)),
            other => Err(StoreError::InvalidPayloadForm {
                client_id: client_id.to_string(),
                data_type: data_type.to_string(),
                form: other.to_string(),
            }),
        }
    }
}

/// One row of the session table.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRow {
    /// Partition key: the client identifier.
    pub client_id: String,
    /// Sort key: `"creds"` or `"<category>:<key-id>"`.
    pub data_type: String,
    /// Stored value, in whichever form its writer produced.
    pub payload: Payload,
    /// Epoch millis of the last write.
    pub updated_at: i64,
    /// Retention deadline in epoch seconds. `None` on credential rows.
    pub ttl: Option<i64>,
}

// ═══════════════════════════════════════════════════════════════════════
//  DocumentStore trait
// ═══════════════════════════════════════════════════════════════════════

/// Minimal store contract the session layer needs: query a client's
/// partition, fetch one row, upsert one row.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All rows for a client, in unspecified order.
    async fn query_rows(&self, client_id: &str) -> StoreResult<Vec<SessionRow>>;

    /// One row by composite key, or `None`.
    async fn get_row(&self, client_id: &str, data_type: &str) -> StoreResult<Option<SessionRow>>;

    /// Upsert a row keyed by (client_id, data_type).
    async fn put_row(&self, row: SessionRow) -> StoreResult<()>;
}

// ═══════════════════════════════════════════════════════════════════════
//  SQLite implementation
// ═══════════════════════════════════════════════════════════════════════

/// [`DocumentStore`] backed by the shared SQLite [`Database`].
#[derive(Clone)]
pub struct SqliteDocumentStore {
    db: Database,
}

impl SqliteDocumentStore {
    /// Create a new store backed by `db`.
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

fn row_from_sql(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, String, String, String, i64, Option<i64>)> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    #[instrument(skip(self))]
    async fn query_rows(&self, client_id: &str) -> StoreResult<Vec<SessionRow>> {
        let client_id = client_id.to_string();
        self.db
            .execute(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT client_id, data_type, payload, payload_form, updated_at, ttl \
                     FROM session_rows WHERE client_id = ?1",
                )?;
                let raw = stmt
                    .query_map(rusqlite::params![client_id], row_from_sql)?
                    .collect::<Result<Vec<_>, _>>()?;

                let mut rows = Vec::with_capacity(raw.len());
                for (client_id, data_type, payload, form, updated_at, ttl) in raw {
                    let payload = Payload::from_column(&client_id, &data_type, &form, payload)?;
                    rows.push(SessionRow {
                        client_id,
                        data_type,
                        payload,
                        updated_at,
                        ttl,
                    });
                }
                Ok(rows)
            })
            .await
    }

    #[instrument(skip(self))]
    async fn get_row(&self, client_id: &str, data_type: &str) -> StoreResult<Option<SessionRow>> {
        let client_id = client_id.to_string();
        let data_type = data_type.to_string();
        self.db
            .execute(move |conn| {
                let result = conn.query_row(
                    "SELECT client_id, data_type, payload, payload_form, updated_at, ttl \
                     FROM session_rows WHERE client_id = ?1 AND data_type = ?2",
                    rusqlite::params![client_id, data_type],
                    row_from_sql,
                );
                match result {
                    Ok((client_id, data_type, payload, form, updated_at, ttl)) => {
                        let payload = Payload::from_column(&client_id, &data_type, &form, payload)?;
                        Ok(Some(SessionRow {
                            client_id,
                            data_type,
                            payload,
                            updated_at,
                            ttl,
                        }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(StoreError::Sqlite(e)),
                }
            })
            .await
    }

    #[instrument(skip(self, row), fields(client_id = %row.client_id, data_type = %row.data_type))]
    async fn put_row(&self, row: SessionRow) -> StoreResult<()> {
        let payload = row.payload.to_column()?;
        let form = row.payload.form();
        self.db
            .execute(move |conn| {
                conn.execute(
                    "INSERT INTO session_rows (client_id, data_type, payload, payload_form, updated_at, ttl) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
                     ON CONFLICT(client_id, data_type) DO UPDATE SET \
                     payload = ?3, payload_form = ?4, updated_at = ?5, ttl = ?6",
                    rusqlite::params![row.client_id, row.data_type, payload, form, row.updated_at, row.ttl],
                )?;
                Ok(())
            })
            .await?;
        debug!("session row persisted");
        Ok(())
    }
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn setup_store() -> SqliteDocumentStore {
        let db = Database::open_in_memory().unwrap();
        db.run_migrations().await.unwrap();
        SqliteDocumentStore::new(db)
    }

    fn key_row(client_id: &str, data_type: &str, value: serde_json::Value) -> SessionRow {
        SessionRow {
            client_id: client_id.to_string(),
            data_type: data_type.to_string(),
            payload: Payload::Json(value),
            updated_at: 1_700_000_000_000,
            ttl: Some(1_700_000_000 + 90 * 24 * 60 * 60),
        }
    }

    #[tokio::test]
    async fn put_and_get_round_trip() {
        let store = setup_store().await;

        let row = key_row("client-a", "pre-key:42", json!({"public": "abc"}));
        store.put_row(row.clone()).await.unwrap();

        let fetched = store.get_row("client-a", "pre-key:42").await.unwrap();
        assert_eq!(fetched, Some(row));
    }

    #[tokio::test]
    async fn get_missing_row_is_none() {
        let store = setup_store().await;
        let fetched = store.get_row("client-a", "creds").await.unwrap();
        assert!(fetched.is_none());
    }

    #[tokio::test]
    async fn put_is_an_upsert() {
        let store = setup_store().await;

        store
            .put_row(key_row("client-a", "session:peer", json!({"v": 1})))
            .await
            .unwrap();
        store
            .put_row(key_row("client-a", "session:peer", json!({"v": 2})))
            .await
            .unwrap();

        let rows = store.query_rows("client-a").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].payload, Payload::Json(json!({"v": 2})));
    }

    #[tokio::test]
    async fn query_returns_only_the_clients_partition() {
        let store = setup_store().await;

        store
            .put_row(key_row("client-a", "pre-key:1", json!({})))
            .await
            .unwrap();
        store
            .put_row(key_row("client-a", "pre-key:2", json!({})))
            .await
            .unwrap();
        store
            .put_row(key_row("client-b", "pre-key:1", json!({})))
            .await
            .unwrap();

        let rows = store.query_rows("client-a").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.client_id == "client-a"));
    }

    #[tokio::test]
    async fn text_payload_survives_verbatim() {
        let store = setup_store().await;

        // Credential rows are stored as opaque strings; the store must not
        // reparse or normalize them.
        let raw = r#"{"me":{"id":"123"},"noiseKey":{"type":"Buffer","data":"AQID"}}"#;
        store
            .put_row(SessionRow {
                client_id: "client-a".into(),
                data_type: "creds".into(),
                payload: Payload::Text(raw.to_string()),
                updated_at: 0,
                ttl: None,
            })
            .await
            .unwrap();

        let fetched = store.get_row("client-a", "creds").await.unwrap().unwrap();
        assert_eq!(fetched.payload, Payload::Text(raw.to_string()));
        assert_eq!(fetched.ttl, None);
    }
}
