//! SQLite-backed record store.
//!
//! Contacts live in a single table with an `is_deleted` soft-delete flag.
//! Foreign keys are switched on for every connection so that the store's
//! own integrity constraints reject a purge at delete time, which is exactly
//! what rollback mode rehearses.

use std::path::Path;

use colored::*;
use rusqlite::{Connection, OpenFlags, params, params_from_iter};

use super::{CandidateFilter, PurgeTransaction, RecordReader, RecordStore, is_valid_identifier};
use crate::domain::{ContactRecord, RecordId};
use crate::error::{PurgeError, Result};

pub const CONTACT_TABLE: &str = "contacts";
pub const USER_LINK_TABLE: &str = "uf_match";
pub const CONTRIBUTION_TABLE: &str = "contributions";
pub const MEMBERSHIP_TABLE: &str = "memberships";

/// Tables a run cannot work without.
const REQUIRED_TABLES: &[&str] = &[CONTACT_TABLE, USER_LINK_TABLE];

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS contacts (
        id INTEGER PRIMARY KEY,
        is_deleted INTEGER NOT NULL DEFAULT 0,
        display_name TEXT NOT NULL DEFAULT '',
        contact_type TEXT NOT NULL DEFAULT 'Individual'
    );

    CREATE INDEX IF NOT EXISTS idx_contacts_deleted ON contacts(is_deleted);

    CREATE TABLE IF NOT EXISTS uf_match (
        id INTEGER PRIMARY KEY,
        contact_id INTEGER NOT NULL REFERENCES contacts(id) ON DELETE CASCADE,
        uf_id INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS contributions (
        id INTEGER PRIMARY KEY,
        contact_id INTEGER NOT NULL REFERENCES contacts(id) ON DELETE RESTRICT,
        total_amount REAL NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS memberships (
        id INTEGER PRIMARY KEY,
        contact_id INTEGER NOT NULL REFERENCES contacts(id) ON DELETE RESTRICT,
        status TEXT NOT NULL DEFAULT 'Current'
    );
    "#;

/// Record store over a rusqlite connection.
pub struct SqliteStore {
    db: Connection,
    /// Echo raw queries to stdout
    verbose: bool,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("verbose", &self.verbose)
            .finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open an existing store database.
    ///
    /// The file must already exist; a missing database is a setup error rather
    /// than an empty store.
    pub fn open(path: &Path) -> Result<Self> {
        let db = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX)
            .map_err(|e| PurgeError::Store(format!("cannot open {}: {}", path.display(), e)))?;
        Self::from_connection(db)
    }

    /// Create or open a database at `path` and make sure the schema exists.
    pub fn create(path: &Path) -> Result<Self> {
        let db = Connection::open(path)?;
        db.execute_batch(SCHEMA)?;
        Self::from_connection(db)
    }

    /// Fresh in-memory store with the schema in place.
    pub fn open_in_memory() -> Result<Self> {
        let db = Connection::open_in_memory()?;
        db.execute_batch(SCHEMA)?;
        Self::from_connection(db)
    }

    /// Wrap an existing connection, enabling foreign keys and probing readiness.
    pub fn from_connection(db: Connection) -> Result<Self> {
        db.execute_batch("PRAGMA foreign_keys = ON;")?;
        let store = Self { db, verbose: false };
        store.ensure_ready()?;
        Ok(store)
    }

    /// Echo raw queries to stdout
    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    /// Underlying connection, for fixtures and extra schema.
    pub fn connection(&self) -> &Connection {
        &self.db
    }

    /// Insert or replace a contact, including its user link.
    pub fn insert_contact(&self, record: &ContactRecord) -> Result<()> {
        self.db.execute(
            "INSERT OR REPLACE INTO contacts (id, is_deleted, display_name, contact_type) VALUES (?1, ?2, ?3, ?4)",
            params![record.id, record.is_deleted, record.display_name, record.contact_type],
        )?;
        if let Some(uf_id) = record.user_id {
            self.db.execute(
                "INSERT INTO uf_match (contact_id, uf_id) VALUES (?1, ?2)",
                params![record.id, uf_id],
            )?;
        }
        Ok(())
    }

    /// Flip the soft-delete flag of a contact.
    pub fn set_deleted(&self, id: RecordId, is_deleted: bool) -> Result<()> {
        self.db.execute(
            "UPDATE contacts SET is_deleted = ?1 WHERE id = ?2",
            params![is_deleted, id],
        )?;
        Ok(())
    }

    fn ensure_ready(&self) -> Result<()> {
        for table in REQUIRED_TABLES {
            if !self.has_table(table)? {
                return Err(PurgeError::StoreNotReady(format!("missing table {}", table)));
            }
        }
        Ok(())
    }

    fn trace(&self, sql: &str, params: &str) {
        log::debug!("query: {} [{}]", sql.trim(), params);
        if self.verbose {
            println!("{} {} [{}]", "query:".dimmed(), sql.trim(), params);
        }
    }
}

impl RecordReader for SqliteStore {
    fn list_candidates(&self, filter: &CandidateFilter) -> Result<Vec<RecordId>> {
        let mut sql = String::from("SELECT id FROM contacts WHERE 1 = 1");
        if filter.soft_deleted_only {
            sql.push_str(" AND is_deleted = 1");
        }
        if filter.id_greater_than.is_some() {
            sql.push_str(" AND id > ?1");
        }
        sql.push_str(" ORDER BY id ASC");

        let cursor = filter.id_greater_than.map(|id| id.to_string()).unwrap_or_default();
        self.trace(&sql, &cursor);

        let bound: Vec<RecordId> = filter.id_greater_than.into_iter().collect();
        let mut stmt = self.db.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(bound.iter()), |row| row.get::<_, RecordId>(0))?;

        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }

        if self.verbose {
            println!("{} {} row(s)", "result:".dimmed(), ids.len());
        }
        Ok(ids)
    }

    fn fetch(&self, id: RecordId) -> Result<Option<ContactRecord>> {
        let sql = r#"
            SELECT c.id, c.is_deleted, c.display_name, c.contact_type,
                   (SELECT u.uf_id FROM uf_match u WHERE u.contact_id = c.id ORDER BY u.id LIMIT 1)
            FROM contacts c
            WHERE c.id = ?1
            "#;
        log::debug!("query: fetch contact {}", id);

        let result = self.db.query_row(sql, [id], |row| {
            Ok(ContactRecord {
                id: row.get(0)?,
                is_deleted: row.get(1)?,
                display_name: row.get(2)?,
                contact_type: row.get(3)?,
                user_id: row.get(4)?,
            })
        });

        match result {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn count_references(&self, table: &str, column: &str, id: RecordId) -> Result<u64> {
        if !is_valid_identifier(table) || !is_valid_identifier(column) {
            return Err(PurgeError::InvalidCheck(format!("bad identifier {}.{}", table, column)));
        }
        let sql = format!("SELECT COUNT(*) FROM \"{}\" WHERE \"{}\" = ?1", table, column);
        log::debug!("query: {} [{}]", sql, id);

        let count: i64 = self.db.query_row(&sql, [id], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    fn has_table(&self, table: &str) -> Result<bool> {
        let count: i64 = self.db.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn has_column(&self, table: &str, column: &str) -> Result<bool> {
        let count: i64 = self.db.query_row(
            "SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name = ?2",
            [table, column],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

impl RecordStore for SqliteStore {
    fn begin_transaction(&mut self) -> Result<Box<dyn PurgeTransaction + '_>> {
        let tx = self.db.transaction()?;
        Ok(Box::new(SqlitePurgeTransaction { tx }))
    }
}

/// Transaction handle; dropping it without commit rolls back.
pub struct SqlitePurgeTransaction<'a> {
    tx: rusqlite::Transaction<'a>,
}

impl PurgeTransaction for SqlitePurgeTransaction<'_> {
    fn purge(&mut self, id: RecordId) -> Result<()> {
        log::debug!("query: delete contact {}", id);
        let removed = self.tx.execute("DELETE FROM contacts WHERE id = ?1", [id])?;
        if removed == 0 {
            return Err(PurgeError::Store(format!("contact {} vanished before delete", id)));
        }
        Ok(())
    }

    fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit()?;
        Ok(())
    }

    fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn seeded_store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_contact(&ContactRecord::trashed(10, "Ten")).unwrap();
        store.insert_contact(&ContactRecord::trashed(11, "Eleven")).unwrap();
        store.insert_contact(&ContactRecord::trashed(12, "Twelve")).unwrap();
        let mut live = ContactRecord::trashed(13, "Alive");
        live.is_deleted = false;
        store.insert_contact(&live).unwrap();
        store
    }

    #[test]
    fn test_open_missing_file_fails() {
        let temp = TempDir::new().unwrap();
        let result = SqliteStore::open(&temp.path().join("missing.db"));
        assert!(matches!(result, Err(PurgeError::Store(_))));
    }

    #[test]
    fn test_open_without_schema_is_not_ready() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("empty.db");
        Connection::open(&path).unwrap().execute_batch("CREATE TABLE other (id INTEGER);").unwrap();

        let result = SqliteStore::open(&path);
        assert!(matches!(result, Err(PurgeError::StoreNotReady(_))));
    }

    #[test]
    fn test_create_then_open() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("crm.db");
        {
            let store = SqliteStore::create(&path).unwrap();
            store.insert_contact(&ContactRecord::trashed(5, "Five")).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.list_candidates(&CandidateFilter::trashed()).unwrap(), vec![5]);
    }

    #[test]
    fn test_list_candidates_only_trashed_ascending() {
        let store = seeded_store();
        let ids = store.list_candidates(&CandidateFilter::trashed()).unwrap();
        assert_eq!(ids, vec![10, 11, 12]);
    }

    #[test]
    fn test_list_candidates_resume_after() {
        let store = seeded_store();
        let ids = store.list_candidates(&CandidateFilter::trashed().after(Some(10))).unwrap();
        assert_eq!(ids, vec![11, 12]);

        let ids = store.list_candidates(&CandidateFilter::trashed().after(Some(12))).unwrap();
        assert!(ids.is_empty());
    }

    #[test]
    fn test_list_all_records() {
        let store = seeded_store();
        let filter = CandidateFilter {
            soft_deleted_only: false,
            id_greater_than: None,
        };
        assert_eq!(store.list_candidates(&filter).unwrap(), vec![10, 11, 12, 13]);
    }

    #[test]
    fn test_fetch() {
        let store = seeded_store();
        store.insert_contact(&ContactRecord::trashed(20, "Linked").with_user(99)).unwrap();

        let record = store.fetch(20).unwrap().unwrap();
        assert_eq!(record.display_name, "Linked");
        assert!(record.is_deleted);
        assert_eq!(record.user_id, Some(99));

        let record = store.fetch(13).unwrap().unwrap();
        assert!(!record.is_deleted);
        assert_eq!(record.user_id, None);
    }

    #[test]
    fn test_fetch_missing() {
        let store = seeded_store();
        assert!(store.fetch(404).unwrap().is_none());
    }

    #[test]
    fn test_count_references() {
        let store = seeded_store();
        store
            .connection()
            .execute("INSERT INTO contributions (contact_id, total_amount) VALUES (10, 25.0), (10, 5.0)", [])
            .unwrap();

        assert_eq!(store.count_references(CONTRIBUTION_TABLE, "contact_id", 10).unwrap(), 2);
        assert_eq!(store.count_references(CONTRIBUTION_TABLE, "contact_id", 11).unwrap(), 0);
    }

    #[test]
    fn test_count_references_rejects_bad_identifier() {
        let store = seeded_store();
        let result = store.count_references("contributions; --", "contact_id", 10);
        assert!(matches!(result, Err(PurgeError::InvalidCheck(_))));
    }

    #[test]
    fn test_has_table() {
        let store = seeded_store();
        assert!(store.has_table(CONTACT_TABLE).unwrap());
        assert!(store.has_table(MEMBERSHIP_TABLE).unwrap());
        assert!(!store.has_table("campagnodon_transactions").unwrap());
    }

    #[test]
    fn test_has_column() {
        let store = seeded_store();
        assert!(store.has_column(CONTRIBUTION_TABLE, "contact_id").unwrap());
        assert!(!store.has_column(CONTRIBUTION_TABLE, "contactid").unwrap());
        assert!(!store.has_column("campagnodon_transactions", "contact_id").unwrap());
    }

    #[test]
    fn test_purge_commit_removes_record() {
        let mut store = seeded_store();
        let mut tx = store.begin_transaction().unwrap();
        tx.purge(10).unwrap();
        tx.commit().unwrap();

        assert!(store.fetch(10).unwrap().is_none());
    }

    #[test]
    fn test_purge_rollback_keeps_record() {
        let mut store = seeded_store();
        let mut tx = store.begin_transaction().unwrap();
        tx.purge(10).unwrap();
        tx.rollback().unwrap();

        let record = store.fetch(10).unwrap().unwrap();
        assert!(record.is_deleted);
    }

    #[test]
    fn test_dropped_transaction_rolls_back() {
        let mut store = seeded_store();
        {
            let mut tx = store.begin_transaction().unwrap();
            tx.purge(11).unwrap();
        }
        assert!(store.fetch(11).unwrap().is_some());
    }

    #[test]
    fn test_purge_blocked_by_foreign_key() {
        let mut store = seeded_store();
        store
            .connection()
            .execute("INSERT INTO memberships (contact_id) VALUES (12)", [])
            .unwrap();

        let mut tx = store.begin_transaction().unwrap();
        let result = tx.purge(12);
        assert!(result.is_err());
        tx.rollback().unwrap();

        assert!(store.fetch(12).unwrap().is_some());
    }

    #[test]
    fn test_purge_missing_record_fails() {
        let mut store = seeded_store();
        let mut tx = store.begin_transaction().unwrap();
        assert!(matches!(tx.purge(404), Err(PurgeError::Store(_))));
    }

    #[test]
    fn test_set_deleted() {
        let store = seeded_store();
        store.set_deleted(10, false).unwrap();
        assert!(!store.fetch(10).unwrap().unwrap().is_deleted);
    }
}
