//! codio CLI entry point.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "codio",
    version,
    about = "Replay recorded programming sessions with synchronized narration"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List codios in the library folder
    List {
        /// Library folder to scan instead of the configured one
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Show metadata and a timeline summary for a codio
    Info {
        /// Path to an unpacked codio directory
        path: PathBuf,
    },
    /// Play a codio
    Play {
        /// Path to an unpacked codio directory
        path: PathBuf,
        /// Start playback this many seconds in
        #[arg(long)]
        start_at: Option<f64>,
        /// Skip the narration track
        #[arg(long)]
        no_audio: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::List { dir } => commands::list::handle(dir),
        Commands::Info { path } => commands::info::handle(&path),
        Commands::Play {
            path,
            start_at,
            no_audio,
        } => commands::play::handle(&path, start_at, no_audio),
    }
}
