//! Run summary types.

use std::fmt;

use crate::domain::{Deleted, OutcomeLine, RecordId};

/// Why the per-record loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Every candidate was processed
    Exhausted,
    /// Interrupt received
    Cancelled,
    /// Max record count reached
    MaxCount,
    /// Wall-clock deadline passed
    Deadline,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::Exhausted => "all candidates processed",
            StopReason::Cancelled => "cancelled",
            StopReason::MaxCount => "max count reached",
            StopReason::Deadline => "deadline reached",
        }
    }

    /// Returns true if the run ended before the candidate list was exhausted
    pub fn is_early(&self) -> bool {
        !matches!(self, StopReason::Exhausted)
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters for a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Size of the candidate snapshot
    pub candidates: usize,
    /// Outcome lines written
    pub processed: usize,
    /// `deleted=Y`
    pub purged: usize,
    /// `deleted=Rollbacked`
    pub rolled_back: usize,
    /// No error and nothing deleted (test mode)
    pub eligible: usize,
    /// Outcomes carrying an error
    pub rejected: usize,
    /// Last record that produced an outcome, usable as the next resume cursor
    pub last_id: Option<RecordId>,
    pub stop: StopReason,
}

impl RunSummary {
    pub fn new(candidates: usize) -> Self {
        Self {
            candidates,
            processed: 0,
            purged: 0,
            rolled_back: 0,
            eligible: 0,
            rejected: 0,
            last_id: None,
            stop: StopReason::Exhausted,
        }
    }

    pub fn record(&mut self, outcome: &OutcomeLine) {
        self.processed += 1;
        self.last_id = Some(outcome.id);
        if outcome.is_error() {
            self.rejected += 1;
            return;
        }
        match outcome.deleted {
            Deleted::Yes => self.purged += 1,
            Deleted::Rollbacked => self.rolled_back += 1,
            Deleted::No => self.eligible += 1,
        }
    }
}
