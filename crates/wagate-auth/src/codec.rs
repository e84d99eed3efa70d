//! Binary-safe key codec.
//!
//! The document store is JSON-oriented, but key material carries raw byte
//! buffers. On encode, every buffer anywhere in the tree becomes a tagged
//! object `{"type":"Buffer","data":"<base64>"}`; on decode the reviver
//! reverses it.
//!
//! Decode accepts both on-row forms: an opaque pre-serialized string (the
//! migration tool's credential rows) and a structured JSON document (the
//! live path's key rows). A structured payload is re-serialized to a string
//! first and parsed through the same reviver. That normalization is the one
//! point that keeps a structured payload from bypassing buffer
//! reconstruction entirely.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{json, Map, Value};

use crate::error::{AuthError, AuthResult};
use crate::value::AuthValue;

/// Tag value marking an encoded buffer object.
const BUFFER_TAG: &str = "Buffer";

// ── encode ───────────────────────────────────────────────────────────

/// Encode a value into its JSON-safe storable form.
pub fn encode(value: &AuthValue) -> Value {
    match value {
        AuthValue::Null => Value::Null,
        AuthValue::Bool(b) => Value::Bool(*b),
        AuthValue::Number(n) => Value::Number(n.clone()),
        AuthValue::String(s) => Value::String(s.clone()),
        AuthValue::Bytes(bytes) => json!({
            "type": BUFFER_TAG,
            "data": STANDARD.encode(bytes),
        }),
        AuthValue::Array(items) => Value::Array(items.iter().map(encode).collect()),
        AuthValue::Object(map) => {
            let encoded: Map<String, Value> =
                map.iter().map(|(k, v)| (k.clone(), encode(v))).collect();
            Value::Object(encoded)
        }
    }
}

/// Encode straight to a JSON string (the credential row form).
pub fn encode_to_string(value: &AuthValue) -> String {
    encode(value).to_string()
}

// ── decode ───────────────────────────────────────────────────────────

/// Decode a stored payload in either of its two forms.
pub fn decode(payload: &wagate_store::Payload) -> AuthResult<AuthValue> {
    let text = match payload {
        wagate_store::Payload::Text(s) => s.clone(),
        // Structured payloads go back through a string so the reviver sees
        // the exact shape a pre-serialized row would produce.
        wagate_store::Payload::Json(v) => serde_json::to_string(v)?,
    };
    decode_str(&text)
}

/// Parse a JSON string with the buffer-aware reviver.
pub fn decode_str(text: &str) -> AuthResult<AuthValue> {
    let value: Value = serde_json::from_str(text)?;
    revive(value)
}

/// Reverse [`encode`] on a parsed JSON tree.
fn revive(value: Value) -> AuthResult<AuthValue> {
    match value {
        Value::Null => Ok(AuthValue::Null),
        Value::Bool(b) => Ok(AuthValue::Bool(b)),
        Value::Number(n) => Ok(AuthValue::Number(n)),
        Value::String(s) => Ok(AuthValue::String(s)),
        Value::Array(items) => Ok(AuthValue::Array(
            items.into_iter().map(revive).collect::<AuthResult<_>>()?,
        )),
        Value::Object(map) => {
            if let Some(bytes) = revive_buffer(&map)? {
                return Ok(AuthValue::Bytes(bytes));
            }
            let revived = map
                .into_iter()
                .map(|(k, v)| Ok((k, revive(v)?)))
                .collect::<AuthResult<_>>()?;
            Ok(AuthValue::Object(revived))
        }
    }
}

/// Recognize a tagged buffer object, returning its bytes.
///
/// The `data` field may be a base64 string (current writers) or an array of
/// byte numbers (older serializer output); both must decode.
fn revive_buffer(map: &Map<String, Value>) -> AuthResult<Option<Vec<u8>>> {
    let is_tagged = map.get("type").and_then(Value::as_str) == Some(BUFFER_TAG);
    if !is_tagged {
        return Ok(None);
    }

    match map.get("data") {
        Some(Value::String(b64)) => {
            let bytes = STANDARD
                .decode(b64)
                .map_err(|e| AuthError::Decode(format!("bad base64 buffer data: {e}")))?;
            Ok(Some(bytes))
        }
        Some(Value::Array(nums)) => {
            let mut bytes = Vec::with_capacity(nums.len());
            for n in nums {
                let byte = n
                    .as_u64()
                    .filter(|b| *b <= u8::MAX as u64)
                    .ok_or_else(|| AuthError::Decode("buffer byte out of range".to_string()))?;
                bytes.push(byte as u8);
            }
            Ok(Some(bytes))
        }
        other => Err(AuthError::Decode(format!(
            "tagged buffer with unusable data field: {other:?}"
        ))),
    }
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use wagate_store::Payload;

    fn nested_key_material() -> AuthValue {
        AuthValue::object([
            ("keyId", AuthValue::from(7_i64)),
            (
                "keyData",
                AuthValue::object([
                    ("public", AuthValue::Bytes(vec![1, 2, 3, 255])),
                    ("private", AuthValue::Bytes(vec![0, 9, 8])),
                ]),
            ),
            (
                "fingerprints",
                AuthValue::Array(vec![
                    AuthValue::Bytes(vec![42]),
                    AuthValue::from("plain"),
                    AuthValue::Null,
                ]),
            ),
        ])
    }

    #[test]
    fn round_trip_preserves_nested_buffers() {
        let original = nested_key_material();
        let stored = encode(&original);
        let decoded = decode(&Payload::Json(stored)).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn decode_is_form_agnostic() {
        let original = nested_key_material();

        let as_text = Payload::Text(encode_to_string(&original));
        let as_json = Payload::Json(encode(&original));

        let from_text = decode(&as_text).unwrap();
        let from_json = decode(&as_json).unwrap();
        assert_eq!(from_text, from_json);
        assert_eq!(from_text, original);
    }

    #[test]
    fn buffer_data_as_byte_array_is_accepted() {
        let decoded = decode_str(r#"{"type":"Buffer","data":[1,2,3]}"#).unwrap();
        assert_eq!(decoded, AuthValue::Bytes(vec![1, 2, 3]));
    }

    #[test]
    fn untagged_object_with_type_field_stays_an_object() {
        let decoded = decode_str(r#"{"type":"other","data":"x"}"#).unwrap();
        assert!(matches!(decoded, AuthValue::Object(_)));
    }

    #[test]
    fn malformed_json_is_a_decode_error() {
        assert!(matches!(
            decode_str("{not json"),
            Err(AuthError::Decode(_))
        ));
    }

    #[test]
    fn bad_base64_is_a_decode_error() {
        assert!(matches!(
            decode_str(r#"{"type":"Buffer","data":"%%%"}"#),
            Err(AuthError::Decode(_))
        ));
    }

    #[test]
    fn empty_buffer_round_trips() {
        let original = AuthValue::Bytes(vec![]);
        let decoded = decode(&Payload::Json(encode(&original))).unwrap();
        assert_eq!(decoded, original);
    }
}
