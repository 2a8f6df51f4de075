//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Facebook Marketing API extraction CLI
#[derive(Parser, Debug)]
#[command(name = "fbads-sync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (JSON or YAML)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// State file (JSON)
    #[arg(short, long, global = true)]
    pub state: Option<PathBuf>,

    /// Inline state JSON
    #[arg(long, global = true)]
    pub state_json: Option<String>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Test the access token against every configured ad account
    Check {
        /// Inline config JSON
        #[arg(long)]
        config_json: Option<String>,
    },

    /// Print the stream catalog
    Discover,

    /// Extract records from streams
    Read {
        /// Streams to sync (comma-separated, empty = all)
        #[arg(long)]
        streams: Option<String>,

        /// Inline config JSON
        #[arg(long)]
        config_json: Option<String>,

        /// Directory for Parquet output files
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Maximum records per stream and account
        #[arg(long)]
        max_records: Option<usize>,

        /// Keep syncing remaining accounts when one fails
        #[arg(long)]
        keep_going: bool,
    },

    /// List available stream names
    Streams,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON messages, one per line
    Json,
    /// Pretty-printed JSON messages
    Pretty,
    /// Parquet files (requires --output)
    Parquet,
}
