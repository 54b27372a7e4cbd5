mod cli;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use edgekit::config::EdgekitConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "edgekit", version, about = "On-device audience classification")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record a page view and evaluate audience definitions against the history
    Run {
        /// JSON file with an array of audience definitions
        #[arg(long)]
        audiences: PathBuf,
        /// JSON file with the page features (`{"docVector": {...}}`)
        #[arg(long)]
        features: Option<PathBuf>,
        /// Skip the consent check
        #[arg(long)]
        omit_consent: bool,
    },
    /// Print the stored page views
    Views,
    /// Print the current audience matches
    Matched,
    /// Delete all stored page views and matches
    Reset {
        /// Do not ask for confirmation
        #[arg(long)]
        yes: bool,
    },
    /// Check the database and print a health report
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config (for log level)
    let config = EdgekitConfig::load()?;

    // Log to stderr so stdout stays clean for JSON output.
    let filter = EnvFilter::try_new(&config.logging.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Run {
            audiences,
            features,
            omit_consent,
        } => {
            cli::run::run(&config, &audiences, features.as_deref(), omit_consent).await?;
        }
        Command::Views => cli::inspect::views(&config)?,
        Command::Matched => cli::inspect::matched(&config)?,
        Command::Reset { yes } => cli::reset::reset(&config, yes)?,
        Command::Doctor => cli::doctor::doctor(&config)?,
    }

    Ok(())
}
