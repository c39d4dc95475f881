//! Record types fetched from the store.

use serde::{Deserialize, Serialize};

/// Identifier of a record in the store.
pub type RecordId = i64;

/// A contact as it exists in the store at processing time.
///
/// Always fetched fresh by ID, never taken from the candidate snapshot, so
/// `is_deleted` reflects the current flag and not the flag at scan time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    /// Primary key
    pub id: RecordId,
    /// Soft-delete flag ("in trash")
    pub is_deleted: bool,
    /// Display name, best effort
    pub display_name: String,
    /// Individual, Organization, Household...
    pub contact_type: String,
    /// Linked CMS user account, if any
    pub user_id: Option<i64>,
}

impl ContactRecord {
    /// Create a soft-deleted individual with no linked account.
    pub fn trashed(id: RecordId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            is_deleted: true,
            display_name: display_name.into(),
            contact_type: "Individual".to_string(),
            user_id: None,
        }
    }

    /// Set the linked user account
    pub fn with_user(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Returns true if the record is linked to a CMS user account
    pub fn has_linked_user(&self) -> bool {
        self.user_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trashed_defaults() {
        let record = ContactRecord::trashed(42, "Jane Doe");
        assert_eq!(record.id, 42);
        assert!(record.is_deleted);
        assert_eq!(record.display_name, "Jane Doe");
        assert_eq!(record.contact_type, "Individual");
        assert!(!record.has_linked_user());
    }

    #[test]
    fn test_with_user() {
        let record = ContactRecord::trashed(42, "Jane Doe").with_user(7);
        assert_eq!(record.user_id, Some(7));
        assert!(record.has_linked_user());
    }
}
