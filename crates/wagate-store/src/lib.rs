//! # wagate-store
//!
//! Document store for wagate sessions.
//!
//! Every piece of durable session state lives in one composite-key table:
//! partition key = client identifier, sort key = data-type label. The table
//! holds exactly one credential row per client (`"creds"`) plus any number
//! of key rows (`"<category>:<key-id>"`). A second table maps tenant users
//! to their active real-time channel connection; this crate only reads it.
//!
//! Higher layers talk to the store through the [`DocumentStore`] trait so
//! tests can substitute an in-memory double without touching SQLite.

pub mod channel;
pub mod db;
pub mod document;
pub mod error;
pub mod migration;

// ── re-exports ───────────────────────────────────────────────────────

pub use channel::ChannelRegistry;
pub use db::Database;
pub use document::{DocumentStore, Payload, SessionRow, SqliteDocumentStore};
pub use error::{StoreError, StoreResult};
