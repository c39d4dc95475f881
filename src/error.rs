//! Error types for purgr
//!
//! Centralized error handling using thiserror. Only setup-time failures and
//! audit write failures surface as `Err`; per-record problems are carried as
//! outcome lines instead.

use thiserror::Error;

/// All error types that can occur in purgr
#[derive(Debug, Error)]
pub enum PurgeError {
    /// The `--stop-at` expression could not be parsed
    #[error("Invalid deadline expression: {0}")]
    InvalidDeadline(String),

    /// Record store query or connection error
    #[error("Store error: {0}")]
    Store(String),

    /// Store is reachable but missing what a run needs
    #[error("Store environment not ready: {0}")]
    StoreNotReady(String),

    /// Safety-check registry entry is malformed
    #[error("Invalid safety check: {0}")]
    InvalidCheck(String),

    /// Audit output could not be written
    #[error("Audit error: {0}")]
    Audit(String),

    /// Configuration problem
    #[error("Config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type alias for purgr operations
pub type Result<T> = std::result::Result<T, PurgeError>;
