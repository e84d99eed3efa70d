//! The credential record — durable identity material for one client.
//!
//! The record is mutated by merging partial updates from the protocol
//! collaborator into this in-memory accumulator, and the *full* accumulated
//! record is what gets persisted. Two updates in quick succession therefore
//! cannot overwrite each other's fields, which a delta-persist scheme would
//! allow.

use std::collections::BTreeMap;

use crate::error::{AuthError, AuthResult};
use crate::value::AuthValue;

/// Identity marker fields. A session counts as authenticated when either
/// is present and non-empty.
const MARKER_FIELDS: [&str; 2] = ["me", "account"];

/// Durable identity/pairing material for a client. Never expires.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Credential {
    fields: BTreeMap<String, AuthValue>,
}

impl Credential {
    /// A freshly initialized, empty credential — what an unpaired client
    /// starts from.
    pub fn init() -> Self {
        Self::default()
    }

    /// True when no field has ever been set.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Overlay a partial update onto the accumulator, field by field.
    pub fn merge(&mut self, delta: Credential) {
        for (key, value) in delta.fields {
            self.fields.insert(key, value);
        }
    }

    /// Whether the record carries a non-empty identity/account marker.
    pub fn is_authenticated(&self) -> bool {
        MARKER_FIELDS
            .iter()
            .any(|field| self.fields.get(*field).is_some_and(AuthValue::is_marker))
    }

    /// Field lookup.
    pub fn get(&self, key: &str) -> Option<&AuthValue> {
        self.fields.get(key)
    }

    /// Set a single field. Mostly useful for building deltas.
    pub fn set(&mut self, key: impl Into<String>, value: AuthValue) {
        self.fields.insert(key.into(), value);
    }

    /// View the record as a value for encoding.
    pub fn to_value(&self) -> AuthValue {
        AuthValue::Object(self.fields.clone())
    }

    /// Rebuild a record from a decoded value. Anything but an object means
    /// the row was not a credential record.
    pub fn from_value(value: AuthValue) -> AuthResult<Self> {
        match value {
            AuthValue::Object(fields) => Ok(Self { fields }),
            other => Err(AuthError::Decode(format!(
                "credential record is not an object: {other:?}"
            ))),
        }
    }
}

impl FromIterator<(String, AuthValue)> for Credential {
    fn from_iter<I: IntoIterator<Item = (String, AuthValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(entries: &[(&str, AuthValue)]) -> Credential {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn fresh_credential_is_unauthenticated() {
        let creds = Credential::init();
        assert!(creds.is_empty());
        assert!(!creds.is_authenticated());
    }

    #[test]
    fn disjoint_partial_updates_both_survive() {
        let mut creds = Credential::init();
        creds.merge(delta(&[(
            "me",
            AuthValue::object([("id", AuthValue::from("123@host"))]),
        )]));
        creds.merge(delta(&[("registrationId", AuthValue::from(4431_i64))]));

        assert!(creds.get("me").is_some());
        assert!(creds.get("registrationId").is_some());
    }

    #[test]
    fn later_update_wins_per_field() {
        let mut creds = Credential::init();
        creds.merge(delta(&[("registrationId", AuthValue::from(1_i64))]));
        creds.merge(delta(&[("registrationId", AuthValue::from(2_i64))]));
        assert_eq!(creds.get("registrationId"), Some(&AuthValue::from(2_i64)));
    }

    #[test]
    fn account_marker_alone_authenticates() {
        let mut creds = Credential::init();
        creds.set("account", AuthValue::object([("details", AuthValue::from("sig"))]));
        assert!(creds.is_authenticated());
    }

    #[test]
    fn null_marker_does_not_authenticate() {
        let mut creds = Credential::init();
        creds.set("me", AuthValue::Null);
        assert!(!creds.is_authenticated());
    }

    #[test]
    fn value_round_trip() {
        let mut creds = Credential::init();
        creds.set("me", AuthValue::object([("id", AuthValue::from("1"))]));
        creds.set("noiseKey", AuthValue::Bytes(vec![9, 9]));

        let rebuilt = Credential::from_value(creds.to_value()).unwrap();
        assert_eq!(rebuilt, creds);
    }

    #[test]
    fn non_object_value_is_rejected() {
        assert!(Credential::from_value(AuthValue::from("nope")).is_err());
    }
}
