//! The per-record control loop.
//!
//! For each candidate, in snapshot order:
//! 1. Termination check (cancellation, max count, deadline)
//! 2. Optional pacing delay
//! 3. Fresh fetch by ID
//! 4. Soft-delete flag re-check
//! 5. Safety check chain
//! 6. Mode dispatch (test / rollback / run)
//! 7. One audit line, one progress step
//!
//! Nothing that happens to a single record escapes as an error. The only
//! `Err` out of [`BatchPurgeEngine::run`] is an audit write failure, since an
//! outcome that cannot be recorded would break the audit trail.

use std::io::{self, Write};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Local};

use super::summary::{RunSummary, StopReason};
use crate::audit::{AuditSink, Durable};
use crate::cancel::StopFlag;
use crate::domain::{Deleted, OutcomeLine, RecordId, RunMode};
use crate::error::Result;
use crate::progress::{DEFAULT_INTERVAL, DEFAULT_WIDTH, ProgressReporter};
use crate::safety::{SafetyCheckChain, Verdict};
use crate::store::{CandidateFilter, RecordStore};

/// Immutable parameters of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub mode: RunMode,
    /// Ceiling on the number of records processed
    pub max_count: Option<usize>,
    /// Stop before starting a record once this time has passed
    pub deadline: Option<DateTime<Local>>,
    /// Pause before fetching each record
    pub delay: Duration,
    /// Only consider IDs strictly greater than this
    pub resume_after: Option<RecordId>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            mode: RunMode::Test,
            max_count: None,
            deadline: None,
            delay: Duration::ZERO,
            resume_after: None,
        }
    }
}

impl RunConfig {
    pub fn new(mode: RunMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn with_max_count(mut self, max_count: Option<usize>) -> Self {
        self.max_count = max_count;
        self
    }

    pub fn with_deadline(mut self, deadline: Option<DateTime<Local>>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_resume_after(mut self, resume_after: Option<RecordId>) -> Self {
        self.resume_after = resume_after;
        self
    }

    /// Filter for the candidate scan
    pub fn candidate_filter(&self) -> CandidateFilter {
        CandidateFilter::trashed().after(self.resume_after)
    }

    /// Number of records the run will process at most, given `n` candidates
    pub fn effective_total(&self, n: usize) -> usize {
        match self.max_count {
            Some(max) => n.min(max),
            None => n,
        }
    }
}

/// Orchestrates store, safety checks, audit output and progress for one run.
pub struct BatchPurgeEngine<S: RecordStore, A: Durable> {
    store: S,
    chain: SafetyCheckChain,
    sink: AuditSink<A>,
    config: RunConfig,
    stop: StopFlag,
    progress_out: Box<dyn Write + Send>,
    progress_interval: Duration,
    progress_width: usize,
}

impl<S: RecordStore, A: Durable> BatchPurgeEngine<S, A> {
    /// Progress goes to stderr; use [`with_progress`](Self::with_progress) to redirect it.
    pub fn new(store: S, chain: SafetyCheckChain, sink: AuditSink<A>, config: RunConfig) -> Self {
        Self {
            store,
            chain,
            sink,
            config,
            stop: StopFlag::new(),
            progress_out: Box::new(io::stderr()),
            progress_interval: DEFAULT_INTERVAL,
            progress_width: DEFAULT_WIDTH,
        }
    }

    pub fn with_stop_flag(mut self, stop: StopFlag) -> Self {
        self.stop = stop;
        self
    }

    pub fn with_progress(mut self, out: Box<dyn Write + Send>, interval: Duration, width: usize) -> Self {
        self.progress_out = out;
        self.progress_interval = interval;
        self.progress_width = width;
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn chain(&self) -> &SafetyCheckChain {
        &self.chain
    }

    pub fn into_parts(self) -> (S, AuditSink<A>) {
        (self.store, self.sink)
    }

    /// Take the candidate snapshot for this run's filter.
    pub fn collect_candidates(&self) -> Result<Vec<RecordId>> {
        self.store.list_candidates(&self.config.candidate_filter())
    }

    /// Process `candidates` in order until exhausted or a termination condition fires.
    pub fn run(&mut self, candidates: &[RecordId]) -> Result<RunSummary> {
        let total = self.config.effective_total(candidates.len());
        let mut summary = RunSummary::new(candidates.len());
        let mut progress = ProgressReporter::new(&mut self.progress_out, total)
            .with_interval(self.progress_interval)
            .with_width(self.progress_width);

        log::info!(
            "Run starting: mode={} candidates={} total={} resume_after={:?}",
            self.config.mode,
            candidates.len(),
            total,
            self.config.resume_after
        );

        for &id in candidates {
            if let Some(reason) = termination(&self.stop, &self.config, progress.current_step(), total) {
                log::info!("Stopping before contact {}: {}", id, reason);
                summary.stop = reason;
                break;
            }

            if !self.config.delay.is_zero() {
                thread::sleep(self.config.delay);
            }

            let outcome = process_record(&mut self.store, &self.chain, self.config.mode, id);
            log::debug!(
                "contact {}: deleted={} error={:?}",
                outcome.id,
                outcome.deleted,
                outcome.error
            );

            if let Err(e) = self.sink.write(&outcome) {
                progress.render();
                log::error!("Audit write failed for contact {} ({}): {}", id, outcome.deleted, e);
                return Err(e);
            }
            summary.record(&outcome);
            progress.step();
        }

        progress.render();
        log::info!("Run finished: {:?}", summary);
        Ok(summary)
    }
}

/// Termination conditions, in priority order.
fn termination(stop: &StopFlag, config: &RunConfig, current: usize, total: usize) -> Option<StopReason> {
    if stop.is_stop_requested() {
        return Some(StopReason::Cancelled);
    }
    if current >= total {
        return Some(StopReason::MaxCount);
    }
    match config.deadline {
        Some(deadline) if Local::now() >= deadline => Some(StopReason::Deadline),
        _ => None,
    }
}

/// Take one candidate through fetch, re-check, safety checks and mode dispatch.
fn process_record<S: RecordStore>(store: &mut S, chain: &SafetyCheckChain, mode: RunMode, id: RecordId) -> OutcomeLine {
    let record = match store.fetch(id) {
        Ok(Some(record)) => record,
        Ok(None) => return OutcomeLine::not_found(id),
        Err(e) => {
            log::warn!("fetch failed for contact {}: {}", id, e);
            return OutcomeLine::rejected(id, "", format!("fetch failed: {}", e));
        }
    };
    let name = record.display_name.clone();

    // The flag may have been cleared since the snapshot was taken.
    if !record.is_deleted {
        return OutcomeLine::rejected(id, name, "not deleted");
    }

    if let Verdict::Reject(reason) = chain.evaluate(&record, &*store) {
        return OutcomeLine::rejected(id, name, reason);
    }

    if !mode.attempts_purge() {
        return OutcomeLine::completed(id, name, Deleted::No);
    }

    match attempt_purge(store, mode, id) {
        Ok(deleted) => OutcomeLine::completed(id, name, deleted),
        Err(message) => OutcomeLine::rejected(id, name, message),
    }
}

/// Purge inside a transaction whose fate depends on `mode`.
fn attempt_purge<S: RecordStore>(store: &mut S, mode: RunMode, id: RecordId) -> std::result::Result<Deleted, String> {
    let mut tx = store
        .begin_transaction()
        .map_err(|e| format!("cannot open transaction: {}", e))?;

    if let Err(e) = tx.purge(id) {
        if let Err(rb) = tx.rollback() {
            log::error!("rollback after failed purge of contact {} failed: {}", id, rb);
        }
        return Err(e.to_string());
    }

    match mode {
        RunMode::Run => tx
            .commit()
            .map(|_| Deleted::Yes)
            .map_err(|e| format!("commit failed: {}", e)),
        RunMode::Rollback | RunMode::Test => tx
            .rollback()
            .map(|_| Deleted::Rollbacked)
            .map_err(|e| format!("rollback failed: {}", e)),
    }
}
