//! Built-in safety checks.

use super::{SafetyCheck, Verdict};
use crate::domain::{ContactRecord, RecordId};
use crate::error::Result;
use crate::store::RecordReader;

/// Rejects a fixed set of IDs (the domain contact, service accounts...).
#[derive(Debug, Clone)]
pub struct ProtectedIdsCheck {
    ids: Vec<RecordId>,
    reason: String,
}

impl ProtectedIdsCheck {
    pub fn new(ids: Vec<RecordId>, reason: impl Into<String>) -> Self {
        Self {
            ids,
            reason: reason.into(),
        }
    }
}

impl SafetyCheck for ProtectedIdsCheck {
    fn name(&self) -> &str {
        "protected_ids"
    }

    fn evaluate(&self, record: &ContactRecord, _reader: &dyn RecordReader) -> Result<Verdict> {
        if self.ids.contains(&record.id) {
            Ok(Verdict::reject(&self.reason))
        } else {
            Ok(Verdict::Pass)
        }
    }
}

/// Rejects records linked to a CMS user account.
#[derive(Debug, Clone)]
pub struct LinkedUserCheck {
    reason: String,
}

impl LinkedUserCheck {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

impl SafetyCheck for LinkedUserCheck {
    fn name(&self) -> &str {
        "linked_user"
    }

    fn evaluate(&self, record: &ContactRecord, _reader: &dyn RecordReader) -> Result<Verdict> {
        if record.has_linked_user() {
            Ok(Verdict::reject(&self.reason))
        } else {
            Ok(Verdict::Pass)
        }
    }
}

/// Rejects records still referenced from another table.
#[derive(Debug, Clone)]
pub struct ReferencedByCheck {
    name: String,
    table: String,
    column: String,
    reason: String,
}

impl ReferencedByCheck {
    pub fn new(table: impl Into<String>, column: impl Into<String>, reason: impl Into<String>) -> Self {
        let table = table.into();
        let column = column.into();
        Self {
            name: format!("referenced_by:{}.{}", table, column),
            table,
            column,
            reason: reason.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

impl SafetyCheck for ReferencedByCheck {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, record: &ContactRecord, reader: &dyn RecordReader) -> Result<Verdict> {
        let count = reader.count_references(&self.table, &self.column, record.id)?;
        if count > 0 {
            Ok(Verdict::reject(&self.reason))
        } else {
            Ok(Verdict::Pass)
        }
    }
}
