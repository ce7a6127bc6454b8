mod commands;
mod feed;
mod render;
mod utils;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use feedsync_core::config::Settings;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "feedsync")]
#[command(about = "Mirror a read-only ICS feed into a CalDAV calendar")]
struct Cli {
    /// Config file (default: ~/.config/feedsync/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Show debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create feed events missing from the target calendar (default)
    Sync {
        /// Sync events from this date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Sync events until this date, inclusive (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,

        /// Abort without writing if any feed event can't be read
        #[arg(long)]
        strict: bool,
    },
    /// Delete every event in the target calendar
    Delete {
        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = Settings::load(cli.config.as_deref())?;

    let command = cli.command.unwrap_or(Commands::Sync {
        from: None,
        to: None,
        strict: false,
    });

    match command {
        Commands::Sync { from, to, strict } => {
            commands::sync::run(&settings, from.as_deref(), to.as_deref(), strict).await
        }
        Commands::Delete { force } => commands::delete::run(&settings, force).await,
    }
}

/// Logs go to stderr so stdout carries only the summary line.
/// `RUST_LOG` overrides the default level; `--verbose` overrides both.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("feedsync=debug,feedsync_core=debug,feedsync_caldav=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("feedsync=info,feedsync_core=info,feedsync_caldav=info")
        })
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
