//! Command line interface for oncecall.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// oncecall - inspect and maintain persisted call-result caches.
#[derive(Parser, Debug)]
#[command(name = "oncecall")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file.
    #[arg(short, long, default_value = "oncecall.toml")]
    pub config: PathBuf,

    /// Verbose mode.
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet mode.
    #[arg(short, long)]
    pub quiet: bool,

    /// Command to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initializes configuration and an empty store in a directory.
    Init {
        /// Target directory (default: current directory).
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// Lists the entries of a store.
    Inspect {
        /// Snapshot file (default: the configured store).
        file: Option<PathBuf>,

        /// Only show calls to functions whose name contains this text.
        #[arg(short, long)]
        function: Option<String>,

        /// Maximum number of entries to show.
        #[arg(short, long, default_value_t = 50)]
        limit: usize,
    },

    /// Shows entry counts per function.
    Stats {
        /// Snapshot file (default: the configured store).
        file: Option<PathBuf>,
    },

    /// Verifies that a snapshot exists and can be loaded.
    Check {
        /// Snapshot file (default: the configured store).
        file: Option<PathBuf>,
    },

    /// Loads a snapshot and writes it back.
    Rewrite {
        /// Snapshot file (default: the configured store).
        file: Option<PathBuf>,

        /// Write indented JSON instead of the configured format.
        #[arg(long)]
        pretty: bool,
    },

    /// Shows version.
    Version,
}
