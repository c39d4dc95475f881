//! Configured check registry.
//!
//! The set of checks mirrors the store's delete-integrity constraints, which
//! evolve with its schema, so the list lives in configuration. Optional
//! plugin tables are switched on explicitly with `enabled: true`; a table
//! referenced by an enabled entry that does not exist is a setup error.

use serde::{Deserialize, Serialize};

use super::{LinkedUserCheck, ProtectedIdsCheck, ReferencedByCheck, SafetyCheck, SafetyCheckChain};
use crate::domain::RecordId;
use crate::error::{PurgeError, Result};
use crate::store::{CONTRIBUTION_TABLE, MEMBERSHIP_TABLE, RecordReader, is_valid_identifier};

/// One entry of the `checks` list in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckEntry {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(flatten)]
    pub kind: CheckKind,
}

fn default_enabled() -> bool {
    true
}

/// The kinds of check that can be configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckKind {
    ProtectedIds { ids: Vec<RecordId>, reason: String },
    LinkedUser { reason: String },
    ReferencedBy { table: String, column: String, reason: String },
}

impl CheckEntry {
    pub fn enabled(kind: CheckKind) -> Self {
        Self { enabled: true, kind }
    }

    pub fn disabled(kind: CheckKind) -> Self {
        Self { enabled: false, kind }
    }
}

/// Registry shipped when the config file has no `checks` section.
pub fn default_checks() -> Vec<CheckEntry> {
    vec![
        CheckEntry::enabled(CheckKind::ProtectedIds {
            ids: vec![1],
            reason: "domain contact".to_string(),
        }),
        CheckEntry::enabled(CheckKind::LinkedUser {
            reason: "linked to a CMS user".to_string(),
        }),
        CheckEntry::enabled(CheckKind::ReferencedBy {
            table: CONTRIBUTION_TABLE.to_string(),
            column: "contact_id".to_string(),
            reason: "has contributions".to_string(),
        }),
        CheckEntry::enabled(CheckKind::ReferencedBy {
            table: MEMBERSHIP_TABLE.to_string(),
            column: "contact_id".to_string(),
            reason: "has memberships".to_string(),
        }),
        CheckEntry::disabled(CheckKind::ReferencedBy {
            table: "campagnodon_transactions".to_string(),
            column: "contact_id".to_string(),
            reason: "has campagnodon transactions".to_string(),
        }),
    ]
}

impl SafetyCheckChain {
    /// Build the chain from configured entries, in order.
    ///
    /// Disabled entries are skipped. Every enabled entry is validated against
    /// the store before the run starts.
    pub fn from_entries(entries: &[CheckEntry], reader: &dyn RecordReader) -> Result<Self> {
        let mut chain = SafetyCheckChain::new();
        for entry in entries {
            if !entry.enabled {
                log::info!("safety check disabled: {:?}", entry.kind);
                continue;
            }
            chain.push(build_check(&entry.kind, reader)?);
        }
        log::info!("safety checks: {:?}", chain.names());
        Ok(chain)
    }
}

fn build_check(kind: &CheckKind, reader: &dyn RecordReader) -> Result<Box<dyn SafetyCheck>> {
    match kind {
        CheckKind::ProtectedIds { ids, reason } => {
            require_reason(reason)?;
            Ok(Box::new(ProtectedIdsCheck::new(ids.clone(), reason.as_str())))
        }
        CheckKind::LinkedUser { reason } => {
            require_reason(reason)?;
            Ok(Box::new(LinkedUserCheck::new(reason.as_str())))
        }
        CheckKind::ReferencedBy { table, column, reason } => {
            require_reason(reason)?;
            if !is_valid_identifier(table) || !is_valid_identifier(column) {
                return Err(PurgeError::InvalidCheck(format!("bad identifier {}.{}", table, column)));
            }
            if !reader.has_table(table)? {
                return Err(PurgeError::StoreNotReady(format!(
                    "check referenced_by:{}.{} needs missing table {}",
                    table, column, table
                )));
            }
            if !reader.has_column(table, column)? {
                return Err(PurgeError::StoreNotReady(format!(
                    "check referenced_by:{}.{} needs missing column {}.{}",
                    table, column, table, column
                )));
            }
            Ok(Box::new(ReferencedByCheck::new(table.as_str(), column.as_str(), reason.as_str())))
        }
    }
}

fn require_reason(reason: &str) -> Result<()> {
    if reason.trim().is_empty() {
        return Err(PurgeError::InvalidCheck("empty rejection reason".to_string()));
    }
    Ok(())
}
