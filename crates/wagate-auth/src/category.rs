//! Key record labels and categories.
//!
//! A key record's sort key is `"<category>:<key-id>"`. The key-id may itself
//! contain colons, so the category is recovered by splitting at the *first*
//! colon only. Category names can be prefixes of one another (`sender-key`
//! vs `sender-key-memory`), so any matching against a flat name must try the
//! longest names first.
//!
//! The legacy file layout replaced the label's colon with a hyphen at write
//! time (`"pre-key:1"` → `"pre-key-1.json"`); [`label_from_file_name`]
//! reverses exactly that substitution. This encoding is a contract shared
//! with external tooling — do not change it.

/// Sort-key label of the credential record.
pub const CREDS_LABEL: &str = "creds";

/// The closed set of key categories, ordered longest-first so prefix
/// matching picks `app-state-sync-version` over `app-state-sync-key` and
/// `sender-key-memory` over `sender-key`.
pub static KNOWN_CATEGORIES: &[&str] = &[
    "app-state-sync-version",
    "app-state-sync-key",
    "sender-key-memory",
    "sender-key",
    "pre-key",
    "session",
];

/// Split a key record label into (category, key-id) at the first colon.
///
/// A label with no colon is kept verbatim as its own category with an empty
/// id; nothing is ever discarded for having an unknown shape.
pub fn split_label(label: &str) -> (&str, &str) {
    match label.find(':') {
        Some(idx) => (&label[..idx], &label[idx + 1..]),
        None => (label, ""),
    }
}

/// Build a key record label.
pub fn join_label(category: &str, id: &str) -> String {
    format!("{category}:{id}")
}

/// Recover a row label from a legacy per-key file name (without `.json`).
///
/// The credential file maps to [`CREDS_LABEL`]. Everything else is matched
/// against [`KNOWN_CATEGORIES`] longest-first, restoring the colon the file
/// writer replaced with a hyphen. Unrecognized names pass through verbatim.
pub fn label_from_file_name(base_name: &str) -> String {
    if base_name == CREDS_LABEL {
        return CREDS_LABEL.to_string();
    }

    for category in KNOWN_CATEGORIES {
        let prefix_len = category.len() + 1;
        // Only the `-` separator is required; the key-id may be empty.
        if base_name.len() >= prefix_len
            && base_name.starts_with(category)
            && base_name.as_bytes()[category.len()] == b'-'
        {
            let id = &base_name[prefix_len..];
            return join_label(category, id);
        }
    }

    base_name.to_string()
}

// ── tests ────────────────────────────────────────────────────────────
