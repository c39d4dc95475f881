//! Safe batch-purge engine.
//!
//! The engine walks a snapshot of candidate IDs one record at a time and
//! produces exactly one outcome line per record it starts processing.

mod purge_engine;
mod summary;

pub use purge_engine::{BatchPurgeEngine, RunConfig};
pub use summary::{RunSummary, StopReason};
