//! CLI argument definitions for Wingman.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! dispatching subcommands.

use clap::{Parser, Subcommand};

/// Wingman -- IDE companion for remote LLM services.
#[derive(Parser)]
#[command(
    name = "wingman",
    version,
    about = "Wingman -- sign in to the Wingman control plane",
    long_about = "Manages the Wingman account session: browser-based sign in, \
                  session status, token refresh, and sign out."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in through the browser.
    Login {
        /// Permission scope to request (repeatable). Omit for the default
        /// scope.
        #[arg(long = "scope", short)]
        scopes: Vec<String>,

        /// Print the login URL instead of opening a browser.
        #[arg(long)]
        no_browser: bool,
    },

    /// Sign out and discard the stored session.
    Logout,

    /// Show the current session, if any.
    Status,

    /// Exchange the refresh token for fresh credentials now.
    Refresh,
}
