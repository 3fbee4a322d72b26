//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// TweetDNA timeline harvester
#[derive(Parser, Debug)]
#[command(name = "tweetdna-harvest")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Captured template file (overrides config and environment)
    #[arg(short, long, global = true)]
    pub template: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Capture a request template from a browser HAR export
    Capture {
        /// HAR file saved from the browser's network panel
        #[arg(long)]
        har: PathBuf,
    },

    /// Show the captured template with credentials masked
    Template,

    /// Page through a timeline and export it as JSONL
    Harvest {
        /// Subject (user) id; defaults to the one in the captured template
        #[arg(long)]
        subject_id: Option<String>,

        /// Handle used in the export filename
        #[arg(long)]
        handle: Option<String>,

        /// Stop after this many records (0 = unlimited)
        #[arg(long)]
        max_records: Option<usize>,

        /// Drop records with fewer views
        #[arg(long, default_value = "0")]
        min_views: i64,

        /// Delay between pages in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Keep replies in the export
        #[arg(long)]
        include_replies: bool,

        /// Export directory (overrides config)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check an export file for required fields
    Validate {
        /// JSONL or JSON export file
        file: PathBuf,
    },

    /// Import an export file into an in-memory store and report counts
    Import {
        /// JSONL or JSON export file
        file: PathBuf,
    },

    /// Start the HTTP controller
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}
