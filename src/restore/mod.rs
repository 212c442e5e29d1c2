//! Branch restoration
//!
//! - `RestorePreviewEngine` - Confirm/inspect/cancel flow before a restore
//! - `RestoreService` - Delete, restore and reflog discovery on top of the ledger

mod preview;
mod service;

pub use preview::*;
pub use service::*;
