//! Record store boundary for purgr.
//!
//! The engine only talks to the store through these traits:
//! - [`RecordReader`]: candidate scan, fetch by ID, read-only reference counts
//! - [`RecordStore`]: adds the revocable transaction
//! - [`PurgeTransaction`]: the only place a purge can happen
//!
//! [`SqliteStore`] is the rusqlite-backed implementation.
//!
//! # Example
//!
//! ```ignore
//! use purgr::store::{CandidateFilter, RecordReader, RecordStore, SqliteStore};
//!
//! let mut store = SqliteStore::open(Path::new("/var/lib/crm/crm.db"))?;
//! let ids = store.list_candidates(&CandidateFilter::trashed().after(Some(1200)))?;
//!
//! let mut tx = store.begin_transaction()?;
//! tx.purge(ids[0])?;
//! tx.rollback()?;
//! ```

mod sqlite;

use crate::domain::{ContactRecord, RecordId};
use crate::error::Result;

pub use sqlite::{
    CONTACT_TABLE, CONTRIBUTION_TABLE, MEMBERSHIP_TABLE, SqlitePurgeTransaction, SqliteStore, USER_LINK_TABLE,
};

/// Filter for the candidate scan. Results are always ordered by ID ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFilter {
    /// Only records flagged soft-deleted
    pub soft_deleted_only: bool,
    /// Resume cursor: only IDs strictly greater than this
    pub id_greater_than: Option<RecordId>,
}

impl CandidateFilter {
    /// Soft-deleted records, from the beginning
    pub fn trashed() -> Self {
        Self {
            soft_deleted_only: true,
            id_greater_than: None,
        }
    }

    /// Set the resume cursor
    pub fn after(mut self, id: Option<RecordId>) -> Self {
        self.id_greater_than = id;
        self
    }
}

impl Default for CandidateFilter {
    fn default() -> Self {
        Self::trashed()
    }
}

/// Read-only access to the store. Safety checks only ever see this.
pub trait RecordReader {
    /// Ordered (ascending) snapshot of candidate IDs.
    fn list_candidates(&self, filter: &CandidateFilter) -> Result<Vec<RecordId>>;

    /// Fetch the current state of a record. `Ok(None)` if it no longer exists.
    fn fetch(&self, id: RecordId) -> Result<Option<ContactRecord>>;

    /// Number of rows in `table` whose `column` equals `id`.
    fn count_references(&self, table: &str, column: &str, id: RecordId) -> Result<u64>;

    /// Returns true if `table` exists in the store
    fn has_table(&self, table: &str) -> Result<bool>;

    /// Returns true if `table` has a column named `column`
    fn has_column(&self, table: &str, column: &str) -> Result<bool>;
}

/// Full store access: reads plus the revocable transaction.
pub trait RecordStore: RecordReader {
    /// Open a transaction. Dropping it without commit rolls it back.
    fn begin_transaction(&mut self) -> Result<Box<dyn PurgeTransaction + '_>>;
}

/// An open transaction on the store.
pub trait PurgeTransaction {
    /// Physically remove the record. Store-side integrity constraints are
    /// enforced here.
    fn purge(&mut self, id: RecordId) -> Result<()>;

    fn commit(self: Box<Self>) -> Result<()>;

    fn rollback(self: Box<Self>) -> Result<()>;
}

/// Returns true if `name` is safe to splice into SQL as a table or column name
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
