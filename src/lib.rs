//! git-revive - Track deleted git branches and bring them back safely
//!
//! Branches deleted through this crate are recorded in a durable ledger.
//! Older deletions can be discovered by scanning the reflog. Every restore
//! shows a file-level preview and asks for confirmation before a branch is
//! recreated.
//!
//! # Architecture
//!
//! The restore flow is built from injected capabilities:
//! - **CommandRunner** - Git subprocesses, serialized per working copy
//! - **DurableStore** - Key/value persistence for the ledger
//! - **InteractionSurface** - Prompts and side-by-side diffs
//!
//! # Modules
//!
//! - [`ledger`] - Deletion records, the ledger service and retention pruning
//! - [`git`] - Command runner, gitoxide reads and the reflog scanner
//! - [`restore`] - Preview state machine and restore orchestration
//! - [`portability`] - Export and import of the deletion history
//! - [`ui`] - Interaction surface and its terminal implementation
//! - [`config`] - Configuration and state persistence
//! - [`error`] - Error types

pub mod config;
pub mod error;
pub mod git;
pub mod ledger;
pub mod portability;
pub mod restore;
pub mod ui;

pub use config::{Config, DurableStore, JsonFileStore};
pub use error::{Error, Result};
pub use ledger::{DeletionLedger, DeletionRecord, DeletionSource, Ledger, RetentionHorizon};
pub use restore::{RestoreOutcome, RestoreService};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
