//! Error types for git-revive
//!
//! Uses `thiserror` for ergonomic error definitions with automatic `Display` and `Error` impls.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for git-revive
#[derive(Error, Debug)]
pub enum Error {
    #[error("Git error: {0}")]
    Git(#[from] GitError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Prompt error: {0}")]
    Prompt(#[from] PromptError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Git subprocess and repository errors
#[derive(Error, Debug)]
pub enum GitError {
    #[error("Not a git repository: {0}")]
    NotARepository(PathBuf),

    #[error("git {operation} failed for {target}: {stderr}")]
    CommandFailed {
        operation: String,
        target: String,
        stderr: String,
    },

    #[error("Failed to run git {operation} for {target}: {reason}")]
    SpawnFailed {
        operation: String,
        target: String,
        reason: String,
    },

    #[error("git {operation} for {target} timed out after {after:?}")]
    Timeout {
        operation: String,
        target: String,
        after: std::time::Duration,
    },

    #[error("Branch '{0}' already exists")]
    BranchExists(String),

    #[error("Refusing to delete '{0}': it is the current branch")]
    CurrentBranch(String),

    #[error("Gitoxide error: {0}")]
    Gix(String),

    #[error("Invalid reference: {0}")]
    InvalidRef(String),
}

/// Durable store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read state: {0}")]
    ReadFailed(String),

    #[error("Failed to write state: {0}")]
    WriteFailed(String),

    #[error("Stored value for '{key}' is corrupt: {reason}")]
    Corrupt { key: String, reason: String },
}

/// Import document validation errors
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Document is not valid JSON: {0}")]
    NotJson(String),

    #[error("Document is missing required field '{0}'")]
    MissingField(&'static str),

    #[error("Field '{field}' is malformed: {reason}")]
    MalformedField { field: &'static str, reason: String },

    #[error("Record {index} for repository '{repo}' is invalid: {reason}")]
    InvalidRecord {
        repo: String,
        index: usize,
        reason: String,
    },
}

/// Ledger lookup errors
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("No deletion of '{branch}' at {commit} is recorded for {repo}")]
    NotFound {
        repo: String,
        branch: String,
        commit: String,
    },

    #[error("No deletion of '{branch}' is recorded for {repo}")]
    BranchNotTracked { repo: String, branch: String },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),

    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Failed to create config directory: {0}")]
    DirectoryCreationFailed(PathBuf),
}

/// Interactive prompt errors
#[derive(Error, Debug)]
pub enum PromptError {
    #[error("Failed to read answer: {0}")]
    ReadFailed(String),

    #[error("Failed to render prompt: {0}")]
    RenderFailed(String),
}

/// Result type alias using our error type
pub type Result<T> = std::result::Result<T, Error>;
