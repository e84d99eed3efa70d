//! Real-time channel connection lookup.
//!
//! The external real-time channel collaborator records one row per live
//! connection in `channel_connections`; this core only reads the table to
//! learn where to deliver pairing tokens for a user. Writes happen outside
//! this process.

use tracing::instrument;

use crate::db::Database;
use crate::error::{StoreError, StoreResult};

/// Read-only view over the channel connection registry.
#[derive(Clone)]
pub struct ChannelRegistry {
    db: Database,
}

impl ChannelRegistry {
    /// Create a registry view backed by `db`.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// The active connection identifier for a user, if any.
    ///
    /// When a user has several rows (stale connections the collaborator has
    /// not reaped yet), the most recently connected one wins.
    #[instrument(skip(self))]
    pub async fn connection_for_user(&self, user_id: &str) -> StoreResult<Option<String>> {
        let user_id = user_id.to_string();
        self.db
            .execute(move |conn| {
                let result = conn.query_row(
                    "SELECT connection_id FROM channel_connections \
                     WHERE user_id = ?1 ORDER BY connected_at DESC LIMIT 1",
                    rusqlite::params![user_id],
                    |row| row.get::<_, String>(0),
                );
                match result {
                    Ok(id) => Ok(Some(id)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(StoreError::Sqlite(e)),
                }
            })
            .await
    }
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.run_migrations().await.unwrap();
        db
    }

    async fn insert_connection(db: &Database, connection_id: &str, user_id: &str, at: i64) {
        let connection_id = connection_id.to_string();
        let user_id = user_id.to_string();
        db.execute(move |conn| {
            conn.execute(
                "INSERT INTO channel_connections (connection_id, user_id, connected_at) \
                 VALUES (?1, ?2, ?3)",
                rusqlite::params![connection_id, user_id, at],
            )?;
            Ok(())
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn lookup_finds_connection() {
        let db = setup_db().await;
        insert_connection(&db, "conn-1", "user-a", 100).await;

        let registry = ChannelRegistry::new(db);
        let found = registry.connection_for_user("user-a").await.unwrap();
        assert_eq!(found.as_deref(), Some("conn-1"));
    }

    #[tokio::test]
    async fn lookup_without_connection_is_none() {
        let db = setup_db().await;
        let registry = ChannelRegistry::new(db);
        let found = registry.connection_for_user("user-a").await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn most_recent_connection_wins() {
        let db = setup_db().await;
        insert_connection(&db, "conn-old", "user-a", 100).await;
        insert_connection(&db, "conn-new", "user-a", 200).await;

        let registry = ChannelRegistry::new(db);
        let found = registry.connection_for_user("user-a").await.unwrap();
        assert_eq!(found.as_deref(), Some("conn-new"));
    }
}
