//! Outcome of processing a single candidate.

use std::fmt;

use super::record::RecordId;

/// Value of the `deleted` audit column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deleted {
    /// Nothing was removed
    No,
    /// Purge committed
    Yes,
    /// Purge succeeded and was reverted
    Rollbacked,
}

impl Deleted {
    pub fn as_str(&self) -> &'static str {
        match self {
            Deleted::No => "N",
            Deleted::Yes => "Y",
            Deleted::Rollbacked => "Rollbacked",
        }
    }
}

impl fmt::Display for Deleted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single audit record produced per processed candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeLine {
    pub id: RecordId,
    /// Best effort, empty when the record could not be fetched
    pub name: String,
    /// Empty on success, otherwise the rejection or failure reason
    pub error: String,
    pub deleted: Deleted,
}

impl OutcomeLine {
    /// Candidate vanished between the scan and processing
    pub fn not_found(id: RecordId) -> Self {
        Self::rejected(id, "", "not found")
    }

    /// Record was not processed further; `error` says why
    pub fn rejected(id: RecordId, name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            error: error.into(),
            deleted: Deleted::No,
        }
    }

    /// Record reached the end of the pipeline without error
    pub fn completed(id: RecordId, name: impl Into<String>, deleted: Deleted) -> Self {
        Self {
            id,
            name: name.into(),
            error: String::new(),
            deleted,
        }
    }

    pub fn is_error(&self) -> bool {
        !self.error.is_empty()
    }

    /// Column values in audit order: id, name, error, deleted
    pub fn fields(&self) -> [String; 4] {
        [
            self.id.to_string(),
            self.name.clone(),
            self.error.clone(),
            self.deleted.to_string(),
        ]
    }
}
