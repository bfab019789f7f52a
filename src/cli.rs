use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mediavault")]
#[command(author, version, about = "Media ingestion and conversion pipeline")]
pub struct Cli {
    /// Path to config file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Stage a media file, register it and convert it
    Import {
        /// File to import
        #[arg(required = true)]
        path: PathBuf,

        /// Original filename used to pick audio vs video (defaults to the
        /// file's own name)
        #[arg(long)]
        name: Option<String>,
    },

    /// Stage a media file as an order attachment and convert it
    Attach {
        /// Order ID
        order: String,

        /// File to attach
        path: PathBuf,

        /// Original filename used to pick audio vs video
        #[arg(long)]
        name: Option<String>,
    },

    /// Create an empty order
    NewOrder {
        /// Order title
        title: String,
    },

    /// Re-run the conversion of a registered file from its staging copy
    Convert {
        /// File ID
        file: String,
    },

    /// Re-probe a registered file and store its duration and size
    Refresh {
        /// File ID
        file: String,
    },

    /// Queue conversions for every file still processing
    Resume,

    /// List registered files
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Probe a media file and display duration and size
    Probe {
        /// File to probe
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
