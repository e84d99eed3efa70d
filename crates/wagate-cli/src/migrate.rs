//! One-shot import of a legacy per-file auth directory.
//!
//! The legacy layout kept one JSON file per record under a client's auth
//! directory: `creds.json` plus one file per key record, named with the row
//! label's colon replaced by a hyphen. Import walks the directory once and
//! writes keyed upserts, so re-running after a partial failure converges on
//! the same rows.
//!
//! The credential file is stored verbatim as opaque text and never expires.
//! Key files are parsed and stored structured, with a retention deadline a
//! fixed window ahead. A file that cannot be read or parsed is logged and
//! skipped; one bad record must not abort the run.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};

use wagate_auth::category::{self, CREDS_LABEL};
use wagate_store::{DocumentStore, Payload, SessionRow};

/// Outcome counters for one migration run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Rows written.
    pub migrated: usize,
    /// Files that could not be read, parsed, or stored.
    pub failed: usize,
    /// Directory entries that were not `.json` files.
    pub skipped: usize,
}

/// Import every `.json` file under `auth_dir` as a session row for
/// `client_id`.
pub async fn import_auth_dir(
    store: &Arc<dyn DocumentStore>,
    auth_dir: &Path,
    client_id: &str,
    retention: Duration,
) -> Result<MigrationReport> {
    let mut report = MigrationReport::default();
    let now_millis = Utc::now().timestamp_millis();
    let ttl = Utc::now().timestamp() + retention.as_secs() as i64;

    let entries = std::fs::read_dir(auth_dir)
        .with_context(|| format!("reading auth dir {}", auth_dir.display()))?;

    for entry in entries {
        let entry = entry.context("listing auth dir")?;
        let path = entry.path();
        let Some(base_name) = json_base_name(&path) else {
            report.skipped += 1;
            continue;
        };

        let label = category::label_from_file_name(base_name);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) => {
                warn!(path = %path.display(), %err, "unreadable file; skipping");
                report.failed += 1;
                continue;
            }
        };

        // The credential record stays an opaque string; key records are
        // parsed so later reads get structured payloads.
        let (payload, row_ttl) = if label == CREDS_LABEL {
            (Payload::Text(content), None)
        } else {
            match serde_json::from_str(&content) {
                Ok(value) => (Payload::Json(value), Some(ttl)),
                Err(err) => {
                    warn!(path = %path.display(), %err, "unparseable key file; skipping");
                    report.failed += 1;
                    continue;
                }
            }
        };

        let row = SessionRow {
            client_id: client_id.to_string(),
            data_type: label.clone(),
            payload,
            updated_at: now_millis,
            ttl: row_ttl,
        };
        match store.put_row(row).await {
            Ok(()) => report.migrated += 1,
            Err(err) => {
                warn!(%label, %err, "row write failed; skipping");
                report.failed += 1;
            }
        }
    }

    info!(
        client_id,
        migrated = report.migrated,
        failed = report.failed,
        skipped = report.skipped,
        "auth directory import finished"
    );
    Ok(report)
}

/// File name without the `.json` suffix, or `None` for anything that is not
/// a `.json` file.
fn json_base_name(path: &Path) -> Option<&str> {
    if !path.is_file() {
        return None;
    }
    path.file_name()?.to_str()?.strip_suffix(".json")
}

// ── tests ────────────────────────────────────────────────────────────
