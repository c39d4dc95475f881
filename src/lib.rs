//! purgr - safe batch purge of soft-deleted records
//!
//! Scans a record store for soft-deleted entities, re-validates each one
//! against a chain of safety checks, and purges it in one of three modes
//! (test, rollback, run), writing exactly one audit line per processed record.

pub mod app;
pub mod audit;
pub mod cancel;
pub mod cli;
pub mod config;
pub mod deadline;
pub mod domain;
pub mod engine;
pub mod error;
pub mod progress;
pub mod safety;
pub mod store;

pub use error::{PurgeError, Result};
