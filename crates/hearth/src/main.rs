//! Hearth - client-held login sessions from the command line.
//!
//! Each invocation is one context sharing the session store with every
//! other invocation on the machine.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{debug, warn};

mod commands;

use commands::{inspect, login, logout, refresh, status, watch};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Hearth - client-held login sessions
#[derive(Parser)]
#[command(name = "hearth")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Identity server endpoint
    #[arg(long, global = true, env = "HEARTH_SERVER_URL")]
    pub server: Option<String>,

    /// Shared session store file
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Current location of this context (a trailing #auth marks a fresh sign-in)
    #[arg(long, global = true, default_value = "")]
    pub location: String,

    /// Session timeout in milliseconds
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Evaluate the session once and show who is signed in
    Status(status::StatusArgs),

    /// Keep the session evaluated until interrupted
    Watch(watch::WatchArgs),

    /// Remember this location so a sign-in can return to it
    Login(login::LoginArgs),

    /// End the server-side session
    Logout(logout::LogoutArgs),

    /// Forget the cached session and ask the server again
    Refresh(refresh::RefreshArgs),

    /// Show the stored session record without changing it
    Inspect(inspect::InspectArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Console (human-readable, stderr) + rotating JSON file
    let filter = if cli.verbose {
        "hearth=debug,hearth_session=debug,hearth_client=debug,hearth_config=debug,info"
    } else {
        "hearth=info,hearth_session=warn,hearth_client=warn,warn"
    };

    let log_dir = hearth_config::user_config_dir()
        .map(|d| d.join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"));
    let file_appender = tracing_appender::rolling::daily(&log_dir, "hearth.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "hearth=trace,hearth_session=trace,hearth_client=trace,hearth_config=debug,info",
                )),
        )
        .init();

    let loaded = hearth_config::load_config(None)?;
    for warning in &loaded.warnings {
        warn!("{}", warning);
    }
    debug!(sources = ?loaded.loaded_from(), "Configuration loaded");

    let ctx = commands::Context {
        config: loaded.config,
        server_url: cli.server,
        store_path: cli.store,
        location: cli.location,
        timeout_ms: cli.timeout_ms,
        json_output: cli.json,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Status(args) => status::run(args, &ctx).await,
        Commands::Watch(args) => watch::run(args, &ctx).await,
        Commands::Login(args) => login::run(args, &ctx).await,
        Commands::Logout(args) => logout::run(args, &ctx).await,
        Commands::Refresh(args) => refresh::run(args, &ctx).await,
        Commands::Inspect(args) => inspect::run(args, &ctx).await,
    }
}
