//! CLI entry point for Wingman.
//!
//! This binary provides the `wingman` command: browser-based sign in,
//! session status, manual token refresh, and sign out.

mod callback;
mod cli;
mod config;

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use wingman_auth::{
    AuthError, AuthSessionManager, BrowserLauncher, HttpTokenEndpoint, RedirectHub, SystemBrowser,
};
use wingman_secrets::FileSecretStore;

use crate::callback::CallbackListener;
use crate::cli::{Cli, Commands};
use crate::config::CliConfig;

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Login { scopes, no_browser } => cmd_login(scopes, no_browser).await,
        Commands::Logout => cmd_logout().await,
        Commands::Status => cmd_status().await,
        Commands::Refresh => cmd_refresh().await,
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();
}

/// Prints the login URL instead of launching a browser (`--no-browser`).
struct UrlPrinter;

impl BrowserLauncher for UrlPrinter {
    fn open(&self, url: &str) -> wingman_auth::Result<()> {
        println!("Open this URL in your browser to sign in:");
        println!("  {url}");
        Ok(())
    }
}

/// Assemble the session manager from configuration.
fn build_manager(
    config: &CliConfig,
    redirects: RedirectHub,
    no_browser: bool,
) -> Result<AuthSessionManager> {
    let auth_config = config.auth_config();

    let browser: Arc<dyn BrowserLauncher> = if no_browser {
        Arc::new(UrlPrinter)
    } else {
        Arc::new(SystemBrowser)
    };

    let endpoint =
        HttpTokenEndpoint::new(&auth_config).context("failed to build token endpoint client")?;

    Ok(AuthSessionManager::new(
        auth_config,
        Arc::new(FileSecretStore::new(config.secrets_path())),
        Arc::new(endpoint),
        browser,
        redirects,
    ))
}

// ---------------------------------------------------------------------------
// Subcommands
// ---------------------------------------------------------------------------

async fn cmd_login(scopes: Vec<String>, no_browser: bool) -> Result<()> {
    let config = CliConfig::load()?;

    // The redirect listener must be up before the browser opens, or a
    // fast redirect could land on a closed port.
    let redirects = RedirectHub::new();
    let _listener = CallbackListener::bind(config.redirect_port(), redirects.clone()).await?;

    let manager = build_manager(&config, redirects, no_browser)?;

    if let Some(existing) = manager.get_session().await? {
        println!(
            "Already signed in as {} ({}). Run 'wingman logout' first to switch accounts.",
            existing.account.label, existing.account.id
        );
        return Ok(());
    }

    println!("Waiting for you to finish signing in in the browser...");

    let login = manager.login(&scopes);
    tokio::pin!(login);

    let session = tokio::select! {
        result = &mut login => result,
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received, cancelling login");
            manager.cancel_login(&scopes);
            login.await
        }
    };

    match session {
        Ok(session) => {
            println!(
                "Signed in as {} ({}).",
                session.account.label, session.account.id
            );
            Ok(())
        }
        Err(AuthError::UserCancelled) => bail!("sign in cancelled"),
        Err(AuthError::LoginTimedOut) => {
            bail!("sign in timed out waiting for the browser; try again")
        }
        Err(e) => Err(e).context("sign in failed"),
    }
}

async fn cmd_logout() -> Result<()> {
    let config = CliConfig::load()?;
    let manager = build_manager(&config, RedirectHub::new(), true)?;

    match manager.get_session().await? {
        Some(session) => {
            manager.remove_session(&session.id).await?;
            println!("Signed out {}.", session.account.id);
        }
        None => println!("Not signed in."),
    }
    Ok(())
}

async fn cmd_status() -> Result<()> {
    let config = CliConfig::load()?;
    let manager = build_manager(&config, RedirectHub::new(), true)?;

    match manager.get_session().await? {
        Some(session) => {
            println!("Signed in as {} ({}).", session.account.label, session.account.id);
            if session.scopes.is_empty() {
                println!("Scopes: (default)");
            } else {
                println!("Scopes: {}", session.scopes.join(" "));
            }
            match chrono::DateTime::from_timestamp_millis(session.expires_at_ms) {
                Some(expires) => println!("Access token valid until {expires}"),
                None => println!("Access token expiry unknown"),
            }
        }
        None => println!("Not signed in. Run 'wingman login'."),
    }
    Ok(())
}

async fn cmd_refresh() -> Result<()> {
    let config = CliConfig::load()?;
    let manager = build_manager(&config, RedirectHub::new(), true)?;

    match manager.refresh_sessions().await {
        Ok(()) => {
            println!("Session refreshed.");
            Ok(())
        }
        Err(AuthError::NoSessionFound) => {
            println!("Not signed in. Run 'wingman login'.");
            Ok(())
        }
        Err(e) => {
            // A failed refresh has already dropped the session.
            bail!("refresh failed ({e}); run 'wingman login' to sign in again")
        }
    }
}
