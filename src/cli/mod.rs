//! CLI module for purgr - command-line interface and subcommands.
//!
//! Provides the main entry point with one subcommand per maintenance job.

pub mod commands;

pub use commands::{Cli, Commands, ContactTrashArgs};
