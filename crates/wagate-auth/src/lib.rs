//! # wagate-auth
//!
//! Session credential and cryptographic key persistence.
//!
//! A client's session state is a partitioned key space: one durable
//! credential record plus categorized key records, all stored as rows of the
//! document store. This crate owns:
//!
//! - the binary-safe [`codec`] that round-trips byte buffers through the
//!   JSON-oriented store, tolerating the two on-row forms produced by the
//!   migration tool and the live connection path;
//! - the [`Credential`](creds::Credential) accumulator with merge-before-
//!   persist semantics;
//! - the closed [`category`] label set and its file-name/label encodings;
//! - the [`SessionKeyStore`](keystore::SessionKeyStore), the write-through
//!   key cache backing a live connection.

pub mod category;
pub mod codec;
pub mod creds;
pub mod error;
pub mod keystore;
pub mod value;

// ── re-exports ───────────────────────────────────────────────────────

pub use creds::Credential;
pub use error::{AuthError, AuthResult};
pub use keystore::{KeyUpdates, LoadedSession, SessionKeyStore};
pub use value::AuthValue;
