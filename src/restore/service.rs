//! Restore orchestration
//!
//! Wires the ledger, the git runner and the preview flow together. Every
//! mutation of the working copy happens only after the preview confirmed it.

use std::path::Path;

use tracing::{info, instrument, warn};

use super::preview::RestorePreviewEngine;
use crate::config::DurableStore;
use crate::error::{GitError, LedgerError, Result};
use crate::git::{CommandRunner, ReflogCandidate, ReflogScanner};
use crate::ledger::{DeletionLedger, DeletionRecord, DeletionSource, repo_key, short_hash};
use crate::ui::InteractionSurface;

/// How a restore ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// The branch was recreated at `commit_hash`
    Restored {
        branch_name: String,
        commit_hash: String,
    },
    /// The user declined; nothing changed
    Cancelled,
}

impl RestoreOutcome {
    pub fn is_restored(&self) -> bool {
        matches!(self, Self::Restored { .. })
    }
}

/// Deletes, restores and discovers branches for one process
pub struct RestoreService<R, S, U> {
    runner: R,
    surface: U,
    ledger: DeletionLedger<S>,
    scanner: ReflogScanner,
}

impl<R, S, U> RestoreService<R, S, U>
where
    R: CommandRunner,
    S: DurableStore,
    U: InteractionSurface,
{
    pub fn new(runner: R, surface: U, ledger: DeletionLedger<S>) -> Self {
        Self {
            runner,
            surface,
            ledger,
            scanner: ReflogScanner::new(),
        }
    }

    pub fn ledger(&self) -> &DeletionLedger<S> {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut DeletionLedger<S> {
        &mut self.ledger
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn surface(&self) -> &U {
        &self.surface
    }

    /// Delete a local branch and track the deletion
    ///
    /// The checked-out branch is refused. The commit is resolved before the
    /// branch disappears so the record always carries a full hash.
    #[instrument(skip(self, repo), fields(repo = %repo.display()))]
    pub async fn delete_branch(
        &mut self,
        repo: &Path,
        branch_name: &str,
        force: bool,
    ) -> Result<DeletionRecord> {
        let current = self.runner.current_branch(repo).await?;
        if current == branch_name {
            return Err(GitError::CurrentBranch(branch_name.to_string()).into());
        }

        let commit_hash = self
            .runner
            .resolve_ref(repo, &format!("refs/heads/{}", branch_name))
            .await?;

        self.runner.delete_branch(repo, branch_name, force).await?;

        let key = repo_key(repo);
        self.ledger
            .record(&key, branch_name, &commit_hash, DeletionSource::UserInitiated)
            .await;
        info!("Deleted {} at {}", branch_name, short_hash(&commit_hash));

        Ok(self
            .ledger
            .find(&key, branch_name, Some(commit_hash.as_str()))
            .unwrap_or_else(|| {
                DeletionRecord::new(branch_name, &commit_hash, DeletionSource::UserInitiated)
            }))
    }

    /// Recreate a tracked branch after the user confirms the preview
    ///
    /// The record is removed only once the branch exists again.
    #[instrument(skip(self, repo), fields(repo = %repo.display()))]
    pub async fn restore_from_history(
        &mut self,
        repo: &Path,
        branch_name: &str,
        commit_hash: &str,
    ) -> Result<RestoreOutcome> {
        let key = repo_key(repo);
        if !self.ledger.contains(&key, branch_name, commit_hash) {
            return Err(LedgerError::NotFound {
                repo: key,
                branch: branch_name.to_string(),
                commit: commit_hash.to_string(),
            }
            .into());
        }

        if self.runner.branch_exists(repo, branch_name).await? {
            return Err(GitError::BranchExists(branch_name.to_string()).into());
        }

        if !self.preview(repo, branch_name, commit_hash).await? {
            info!("Restore of {} cancelled", branch_name);
            return Ok(RestoreOutcome::Cancelled);
        }

        self.runner
            .create_branch(repo, branch_name, commit_hash)
            .await?;
        self.ledger.remove(&key, branch_name, commit_hash).await;
        info!("Restored {} at {}", branch_name, short_hash(commit_hash));

        Ok(RestoreOutcome::Restored {
            branch_name: branch_name.to_string(),
            commit_hash: commit_hash.to_string(),
        })
    }

    /// Deletions recorded in the repository's reflog
    pub async fn scan_reflog(&self, repo: &Path) -> Result<Vec<ReflogCandidate>> {
        let text = self.runner.read_reflog(repo).await?;
        Ok(self.scanner.scan(&text))
    }

    /// Recreate a branch found in the reflog; the ledger is not touched
    #[instrument(skip(self, repo, candidate), fields(repo = %repo.display(), branch = %candidate.branch_name))]
    pub async fn restore_from_reflog(
        &mut self,
        repo: &Path,
        candidate: &ReflogCandidate,
    ) -> Result<RestoreOutcome> {
        let commit_hash = self.runner.resolve_ref(repo, &candidate.commit_hash).await?;

        if self.runner.branch_exists(repo, &candidate.branch_name).await? {
            return Err(GitError::BranchExists(candidate.branch_name.clone()).into());
        }

        if !self
            .preview(repo, &candidate.branch_name, &commit_hash)
            .await?
        {
            info!("Restore of {} cancelled", candidate.branch_name);
            return Ok(RestoreOutcome::Cancelled);
        }

        self.runner
            .create_branch(repo, &candidate.branch_name, &commit_hash)
            .await?;
        info!(
            "Restored {} at {} from reflog",
            candidate.branch_name,
            short_hash(&commit_hash)
        );

        Ok(RestoreOutcome::Restored {
            branch_name: candidate.branch_name.clone(),
            commit_hash,
        })
    }

    /// Show what restoring would change and ask for confirmation
    pub async fn preview(&self, repo: &Path, branch_name: &str, commit_hash: &str) -> Result<bool> {
        let confirmed = RestorePreviewEngine::new(&self.runner, &self.surface)
            .preview_and_confirm(repo, branch_name, commit_hash)
            .await?;

        if confirmed && !self.ledger.is_persistent() {
            warn!("Deletion history is not being saved; changes last for this session only");
        }
        Ok(confirmed)
    }
}
