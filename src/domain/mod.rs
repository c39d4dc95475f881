//! Domain types for purgr
//!
//! This module contains the core domain types:
//! - ContactRecord: the full entity fetched by ID at processing time
//! - RunMode: test / rollback / run
//! - OutcomeLine: the single audit record produced per processed candidate

pub mod mode;
pub mod outcome;
pub mod record;

pub use mode::RunMode;
pub use outcome::{Deleted, OutcomeLine};
pub use record::{ContactRecord, RecordId};
