use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Upload a video and generate subtitles in the selected languages
    Process {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Target languages (comma-separated, e.g. "french,german" or "fr,de")
        #[arg(short, long)]
        target_langs: String,

        /// Output directory for subtitle tracks and the playback manifest
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Also download every subtitle file as SRT
        #[arg(long)]
        download: bool,

        /// Register ownership of the processed video on the ledger
        #[arg(long)]
        mint: bool,
    },

    /// List supported target languages
    Languages,

    /// Write a configuration file with default values
    InitConfig {
        /// Destination path
        #[arg(short, long, default_value = "config.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
