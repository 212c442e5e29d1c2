//! User interaction
//!
//! The restore flow talks to the user only through `InteractionSurface`, so
//! the same flow runs in a terminal or under scripted answers in tests.

mod terminal;

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;

pub use terminal::*;

/// Prompts the restore flow needs
#[async_trait]
pub trait InteractionSurface: Send + Sync {
    /// Ask a yes/no question; dismissing counts as "no"
    async fn confirm(&self, prompt: &str) -> Result<bool>;

    /// Offer `options` and return the chosen index, `None` if dismissed
    async fn choose(&self, title: &str, options: &[String]) -> Result<Option<usize>>;

    /// Show one file side by side between two refs
    async fn open_side_by_side_diff(
        &self,
        repo: &Path,
        path: &str,
        ref_a: &str,
        ref_b: &str,
    ) -> Result<()>;
}
