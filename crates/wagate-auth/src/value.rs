//! In-memory value model for credential and key material.
//!
//! [`AuthValue`] is a JSON-like tree with one extra arm: raw byte buffers.
//! Protocol key material is mostly nested maps of byte strings, and the
//! store is JSON-oriented, so the buffer arm is what the codec protects
//! across a round trip.

use std::collections::BTreeMap;

use serde_json::Number;

/// A value that may contain binary buffers anywhere in its structure.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    /// Raw bytes. Encoded as a tagged JSON object on the way to the store.
    Bytes(Vec<u8>),
    Array(Vec<AuthValue>),
    Object(BTreeMap<String, AuthValue>),
}

impl AuthValue {
    /// Build an object from key/value pairs.
    pub fn object<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, AuthValue)>,
        K: Into<String>,
    {
        Self::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v))
                .collect(),
        )
    }

    /// Field lookup on an object; `None` for every other arm.
    pub fn get(&self, key: &str) -> Option<&AuthValue> {
        match self {
            AuthValue::Object(map) => map.get(key),
            _ => None,
        }
    }

    /// String contents, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AuthValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Byte contents, if this is a buffer.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            AuthValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Truthiness in the sense of an identity marker being present:
    /// null, empty strings, `false` and zero do not count.
    pub fn is_marker(&self) -> bool {
        match self {
            AuthValue::Null => false,
            AuthValue::Bool(b) => *b,
            AuthValue::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
            AuthValue::String(s) => !s.is_empty(),
            AuthValue::Bytes(_) | AuthValue::Array(_) | AuthValue::Object(_) => true,
        }
    }
}

impl From<&str> for AuthValue {
    fn from(s: &str) -> Self {
        AuthValue::String(s.to_string())
    }
}

impl From<Vec<u8>> for AuthValue {
    fn from(b: Vec<u8>) -> Self {
        AuthValue::Bytes(b)
    }
}

impl From<i64> for AuthValue {
    fn from(n: i64) -> Self {
        AuthValue::Number(Number::from(n))
    }
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_lookup() {
        let v = AuthValue::object([("id", AuthValue::from("123"))]);
        assert_eq!(v.get("id").and_then(AuthValue::as_str), Some("123"));
        assert!(v.get("missing").is_none());
    }

    #[test]
    fn marker_semantics() {
        assert!(!AuthValue::Null.is_marker());
        assert!(!AuthValue::from("").is_marker());
        assert!(AuthValue::from("123@host").is_marker());
        assert!(AuthValue::object([("id", AuthValue::Null)]).is_marker());
    }
}
