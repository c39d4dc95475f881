//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - contact-trash: purge soft-deleted contacts

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::domain::{RecordId, RunMode};

/// purgr - safely purge soft-deleted records
#[derive(Parser, Debug)]
#[command(name = "purgr")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output (prints raw store queries)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Delete contacts in trash
    ContactTrash(ContactTrashArgs),
}

/// Arguments for the contact-trash job
#[derive(Args, Debug, Clone)]
pub struct ContactTrashArgs {
    /// The file where to output the result. If the file exists, the output is appended
    pub output_file: PathBuf,

    /// test: check only, rollback: delete then roll back, run: delete for real
    #[arg(short, long, value_enum)]
    pub mode: Option<RunMode>,

    /// Process at most this many records
    #[arg(long)]
    pub max: Option<usize>,

    /// Stop starting new records after this time (e.g. "06:00", "+2h", RFC 3339)
    #[arg(long, value_name = "EXPR")]
    pub stop_at: Option<String>,

    /// Pause before each record, in milliseconds
    #[arg(long, value_name = "MS")]
    pub delay_ms: Option<u64>,

    /// Only process IDs greater than this one
    #[arg(long, value_name = "ID")]
    pub resume_after: Option<RecordId>,

    /// Force Y response to every confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Record store database (overrides the config file)
    #[arg(long, value_name = "PATH")]
    pub database: Option<PathBuf>,
}
