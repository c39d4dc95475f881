//! Execution modes for a purge run.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How far a run goes with each eligible record.
///
/// Steps up to the safety checks are identical in every mode; only the fate
/// of the purge transaction differs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Evaluate eligibility, never touch the store
    #[default]
    Test,
    /// Purge inside a transaction, then roll it back
    Rollback,
    /// Purge and commit
    Run,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Test => "test",
            RunMode::Rollback => "rollback",
            RunMode::Run => "run",
        }
    }

    /// Returns true if the mode opens a transaction and attempts the purge
    pub fn attempts_purge(&self) -> bool {
        !matches!(self, RunMode::Test)
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
