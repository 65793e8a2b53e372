use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "crmv")]
#[command(about = "CRM UI verification - authenticated-session setup and inspection")]
#[command(version)]
pub struct Cli {
    /// Enable debug-level logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Session file to operate on (overrides CRMV_SESSION_FILE)
    #[arg(long, global = true, value_name = "FILE")]
    pub session_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate the stored session and log in again only if needed
    Setup {
        /// Launch the browser with a visible window
        #[arg(long)]
        headed: bool,

        /// Discard the stored session and force a fresh login
        #[arg(long)]
        force: bool,
    },

    /// Inspect stored authentication state
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum AuthAction {
    /// Decide whether the stored session is still usable (exit 1 if not)
    Check,

    /// Show cookies and localStorage from the session file
    Show,
}
