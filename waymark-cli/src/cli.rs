//! CLI argument parsing definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Apply and revert ordered migrations against pluggable stores",
    long_about = None
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Set the log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply one migration, or every pending migration of each directory
    Apply {
        /// Migrations directory; repeat for several stores
        /// (default: every folder under the migrations root)
        #[arg(long = "dir", value_name = "DIR")]
        dirs: Vec<PathBuf>,

        /// Run even if recorded state says the migration was already applied
        #[arg(long)]
        force: bool,

        /// Single migration file to apply
        #[arg(value_name = "UNIT")]
        unit: Option<PathBuf>,
    },

    /// Revert a single migration
    Revert {
        /// Run even if recorded state says the migration is not applied
        #[arg(long)]
        force: bool,

        /// Migration file to revert
        #[arg(value_name = "UNIT")]
        unit: PathBuf,
    },

    /// Show the recorded state of every migration in a directory
    Status {
        /// Migrations directory
        #[arg(long, value_name = "DIR")]
        dir: PathBuf,
    },

    /// Create a new, timestamped migration file
    Create {
        /// Migrations directory
        #[arg(long, value_name = "DIR")]
        dir: PathBuf,

        /// Short description used in the file name
        #[arg(value_name = "SLUG")]
        slug: String,
    },

    /// List registered store types
    Stores,

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        config_cmd: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print a sample configuration file
    Sample,

    /// Validate the configuration and show where store settings come from
    Validate {
        /// Migrations directory to resolve store settings for
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,
    },
}
