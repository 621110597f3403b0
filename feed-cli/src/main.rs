//! # feed-cli
//!
//! Terminal front end for the livefeed ordered chat feed.
//!
//! ## Commands
//!
//! - `init`: Create this terminal's author identity
//! - `chat`: Interactive chat over the in-process backend
//! - `replay`: Decode a file of raw records and print the ordered feed
//!
//! ## Example
//!
//! ```bash
//! # Create an identity
//! feed-cli init
//!
//! # Chat with two simulated participants
//! feed-cli chat --peer alice --peer bob
//!
//! # Inspect how a batch of raw records would be shown
//! feed-cli replay records.json
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod presenter;

use commands::{chat, init, replay};

/// Terminal front end for the livefeed ordered chat feed.
#[derive(Parser, Debug)]
#[command(name = "feed-cli")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Data directory for storing the author identity
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create this terminal's author identity
    Init {
        /// Use this author ID instead of a generated one
        #[arg(long, short)]
        author: Option<String>,
    },

    /// Chat interactively; each stdin line is sent as a message
    Chat {
        /// Session configuration file (TOML)
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Simulated participant joining the room (repeatable)
        #[arg(long = "peer")]
        peers: Vec<String>,
    },

    /// Decode a JSON array of raw records and print the ordered feed
    Replay {
        /// File holding the records
        file: PathBuf,

        /// Drop every record after the first malformed one
        #[arg(long)]
        stop_at_first_invalid: bool,

        /// Render entries by this author as mine
        #[arg(long = "as")]
        viewer: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so the transcript on stdout stays clean
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init { author } => {
            let data_dir = ensure_data_dir(cli.data_dir).await?;
            init::run(&data_dir, author.as_deref()).await?;
        }
        Commands::Chat { config, peers } => {
            let data_dir = ensure_data_dir(cli.data_dir).await?;
            chat::run(&data_dir, config.as_deref(), &peers).await?;
        }
        Commands::Replay {
            file,
            stop_at_first_invalid,
            viewer,
        } => {
            replay::run(&file, stop_at_first_invalid, viewer.as_deref()).await?;
        }
    }

    Ok(())
}

/// Resolve the data directory and make sure it exists.
async fn ensure_data_dir(data_dir: Option<PathBuf>) -> Result<PathBuf> {
    let data_dir = match data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };

    tokio::fs::create_dir_all(&data_dir)
        .await
        .context("Failed to create data directory")?;

    Ok(data_dir)
}

/// Get the default data directory for feed-cli.
fn default_data_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("io", "livefeed", "feed-cli")
        .context("Could not determine home directory")?;
    Ok(dirs.data_dir().to_path_buf())
}
