//! Safety checks run against a freshly fetched record before any purge.
//!
//! A [`SafetyCheckChain`] is an ordered list of [`SafetyCheck`]s. Evaluation
//! stops at the first rejection, so the order only decides which reason
//! surfaces when several checks would fail. The chain is assembled from the
//! configured registry at startup (see [`registry`]).

pub mod checks;
pub mod registry;

use crate::domain::ContactRecord;
use crate::error::Result;
use crate::store::RecordReader;

pub use checks::{LinkedUserCheck, ProtectedIdsCheck, ReferencedByCheck};
pub use registry::{CheckEntry, CheckKind, default_checks};

/// Result of a single check, or of the whole chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    /// Human-readable reason, written verbatim to the audit `error` column
    Reject(String),
}

impl Verdict {
    pub fn reject(reason: impl Into<String>) -> Self {
        Verdict::Reject(reason.into())
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }
}

/// A side-effect-free predicate over a record.
///
/// Implementations may read from the store but must never write to it.
pub trait SafetyCheck: Send + Sync {
    /// Short name used in logs and failure messages
    fn name(&self) -> &str;

    fn evaluate(&self, record: &ContactRecord, reader: &dyn RecordReader) -> Result<Verdict>;
}

/// Ordered, short-circuiting chain of safety checks.
#[derive(Default)]
pub struct SafetyCheckChain {
    checks: Vec<Box<dyn SafetyCheck>>,
}

impl SafetyCheckChain {
    pub fn new() -> Self {
        Self { checks: Vec::new() }
    }

    /// Add a check at the end of the chain (builder pattern)
    pub fn with_check(mut self, check: impl SafetyCheck + 'static) -> Self {
        self.checks.push(Box::new(check));
        self
    }

    /// Add a boxed check at the end of the chain
    pub fn push(&mut self, check: Box<dyn SafetyCheck>) {
        self.checks.push(check);
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Names of all checks, in evaluation order
    pub fn names(&self) -> Vec<&str> {
        self.checks.iter().map(|c| c.name()).collect()
    }

    /// Run the checks in order and return the first rejection.
    ///
    /// A check that cannot complete (store error) rejects the record with a
    /// message naming the check; the remaining checks are skipped.
    pub fn evaluate(&self, record: &ContactRecord, reader: &dyn RecordReader) -> Verdict {
        for check in &self.checks {
            match check.evaluate(record, reader) {
                Ok(Verdict::Pass) => continue,
                Ok(rejected) => {
                    log::debug!("contact {} rejected by {}", record.id, check.name());
                    return rejected;
                }
                Err(e) => {
                    log::warn!("check {} failed on contact {}: {}", check.name(), record.id, e);
                    return Verdict::reject(format!("check {} failed: {}", check.name(), e));
                }
            }
        }
        Verdict::Pass
    }
}

impl std::fmt::Debug for SafetyCheckChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SafetyCheckChain").field("checks", &self.names()).finish()
    }
}
