//! Gateway configuration.
//!
//! Settings come from `wagate.toml` in the working directory, each field
//! optional, then environment variables override the file. A missing or
//! invalid file falls back to defaults so read-only commands keep working.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use wagate_session::GatewayTimeouts;

/// Config file looked up in the working directory.
pub const CONFIG_FILE: &str = "wagate.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// SQLite database path for the session store.
    pub db_path: PathBuf,

    /// Management endpoint of the real-time channel, base URL for
    /// pairing-token delivery. Empty means unconfigured.
    pub push_endpoint: String,

    /// Retention window for key rows, in days.
    pub retention_days: u64,

    /// Overall deadline for a pairing run, in seconds.
    pub pairing_timeout_secs: u64,

    /// Overall deadline for a send run, in seconds.
    pub send_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("data/wagate.db"),
            push_endpoint: String::new(),
            retention_days: 90,
            pairing_timeout_secs: 60,
            send_timeout_secs: 25,
        }
    }
}

impl GatewayConfig {
    /// Load from [`CONFIG_FILE`] and apply environment overrides.
    pub fn load() -> Self {
        let mut config = match std::fs::read_to_string(CONFIG_FILE) {
            Ok(content) => Self::from_toml(&content),
            Err(_) => Self::default(),
        };
        config.apply_env();
        config
    }

    /// Parse a TOML document, falling back to defaults if it is invalid.
    pub fn from_toml(content: &str) -> Self {
        match toml::from_str(content) {
            Ok(config) => config,
            Err(err) => {
                warn!(%err, "invalid {CONFIG_FILE}; using defaults");
                Self::default()
            }
        }
    }

    /// Key-row retention window.
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_days * 24 * 60 * 60)
    }

    /// Per-use-case connection deadlines.
    pub fn timeouts(&self) -> GatewayTimeouts {
        GatewayTimeouts {
            pairing: Duration::from_secs(self.pairing_timeout_secs),
            send: Duration::from_secs(self.send_timeout_secs),
        }
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("WAGATE_DB_PATH") {
            self.db_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("WAGATE_PUSH_ENDPOINT") {
            self.push_endpoint = v;
        }
        override_u64(&mut self.retention_days, "WAGATE_RETENTION_DAYS");
        override_u64(&mut self.pairing_timeout_secs, "WAGATE_PAIRING_TIMEOUT_SECS");
        override_u64(&mut self.send_timeout_secs, "WAGATE_SEND_TIMEOUT_SECS");
    }
}

fn override_u64(slot: &mut u64, var: &str) {
    if let Ok(raw) = std::env::var(var) {
        match raw.parse() {
            Ok(v) => *slot = v,
            Err(_) => warn!(var, %raw, "ignoring unparseable override"),
        }
    }
}

// ── tests ────────────────────────────────────────────────────────────
