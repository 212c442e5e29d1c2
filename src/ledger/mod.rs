//! Deletion ledger module
//!
//! Provides the tracked-deletion model:
//! - `DeletionRecord` - One branch deletion event
//! - `DeletionLedger` - Per-repository record store with durable persistence
//! - `prune` - Retention pruning by age

mod deletion_ledger;
mod retention;
mod types;

pub use deletion_ledger::*;
pub use retention::*;
pub use types::*;
