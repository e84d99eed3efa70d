//! Command-line definitions for the `wagate` binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// wagate — messaging session gateway.
#[derive(Parser)]
#[command(
    name = "wagate",
    version,
    about = "Messaging session gateway",
    long_about = "Manages durable messaging sessions: pairs new sessions, sends \
                  messages over existing ones, and imports legacy per-file auth \
                  directories into the session store."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Import a legacy per-file auth directory into the session store.
    Migrate {
        /// Directory holding the legacy per-record JSON files.
        #[arg(long)]
        auth_dir: PathBuf,

        /// Client identifier to file the imported rows under.
        #[arg(long)]
        client_id: String,
    },

    /// Pair a new session, delivering pairing tokens to the user's live
    /// channel connection.
    StartSession {
        /// Tenant user to pair.
        #[arg(long)]
        user_id: String,
    },

    /// Send a text message over an existing session.
    Send {
        /// Tenant user whose session to use.
        #[arg(long)]
        user_id: String,

        /// Recipient phone number (leading `+` accepted).
        #[arg(long)]
        target: String,

        /// Message text.
        #[arg(long)]
        message: String,
    },

    /// Show session store status.
    Status,
}

// ── tests ────────────────────────────────────────────────────────────
