//! Restore preview
//!
//! Shows what restoring a branch would bring back before anything is created.
//! The flow is a small state machine driven by a loop:
//!
//! ```text
//! Idle ──▶ PreviewingFileList ◀──▶ InspectingFile
//!  │              │
//!  └──────────────┴──▶ Confirmed | Cancelled
//! ```

use std::path::Path;

use tracing::{debug, instrument, warn};

use crate::error::Result;
use crate::git::{CommandRunner, DiffEntry};
use crate::ledger::short_hash;
use crate::ui::InteractionSurface;

/// Where the preview flow currently is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewState {
    /// Nothing computed yet
    Idle,
    /// Showing the changed files and waiting for a decision
    PreviewingFileList {
        current_branch: String,
        entries: Vec<DiffEntry>,
    },
    /// Showing one file, then back to the list
    InspectingFile {
        current_branch: String,
        entries: Vec<DiffEntry>,
        index: usize,
    },
    /// The user asked to restore
    Confirmed,
    /// The user cancelled or dismissed a prompt
    Cancelled,
}

impl PreviewState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Cancelled)
    }
}

/// Fixed entries at the top of the file menu
const RESTORE_NOW: usize = 0;
const CANCEL: usize = 1;
const FIRST_FILE: usize = 2;

/// Confirms a restore after showing its impact; never mutates anything
pub struct RestorePreviewEngine<'a, R: ?Sized, U: ?Sized> {
    runner: &'a R,
    surface: &'a U,
}

impl<'a, R, U> RestorePreviewEngine<'a, R, U>
where
    R: CommandRunner + ?Sized,
    U: InteractionSurface + ?Sized,
{
    pub fn new(runner: &'a R, surface: &'a U) -> Self {
        Self { runner, surface }
    }

    /// Run the preview; `true` only when the user chose to restore
    #[instrument(skip(self, repo), fields(repo = %repo.display()))]
    pub async fn preview_and_confirm(
        &self,
        repo: &Path,
        branch_name: &str,
        commit_hash: &str,
    ) -> Result<bool> {
        let mut state = PreviewState::Idle;

        while !state.is_terminal() {
            state = self.step(state, repo, branch_name, commit_hash).await?;
            debug!("Preview moved to {:?}", state_name(&state));
        }

        Ok(state == PreviewState::Confirmed)
    }

    /// Advance the state machine by one transition
    pub async fn step(
        &self,
        state: PreviewState,
        repo: &Path,
        branch_name: &str,
        commit_hash: &str,
    ) -> Result<PreviewState> {
        let target = format!("{} ({})", branch_name, short_hash(commit_hash));

        match state {
            PreviewState::Idle => {
                let diff = match self.runner.current_branch(repo).await {
                    Ok(current) => self
                        .runner
                        .diff_status(repo, &current, commit_hash)
                        .await
                        .map(|entries| (current, entries)),
                    Err(e) => Err(e),
                };

                match diff {
                    Ok((current_branch, entries)) if entries.is_empty() => {
                        let prompt = format!(
                            "No differences between {} and {}. Restore anyway?",
                            target, current_branch
                        );
                        Ok(self.decide(&prompt).await?)
                    }
                    Ok((current_branch, entries)) => Ok(PreviewState::PreviewingFileList {
                        current_branch,
                        entries,
                    }),
                    Err(e) => {
                        warn!("Failed to compute restore preview for {}: {}", target, e);
                        let prompt = format!("Preview failed ({}). Restore {} anyway?", e, target);
                        Ok(self.decide(&prompt).await?)
                    }
                }
            }

            PreviewState::PreviewingFileList {
                current_branch,
                entries,
            } => {
                let title = format!(
                    "Restoring {} changes {} file(s) relative to {}",
                    target,
                    entries.len(),
                    current_branch
                );
                let options = menu_options(&entries);

                match self.surface.choose(&title, &options).await? {
                    Some(RESTORE_NOW) => Ok(PreviewState::Confirmed),
                    Some(CANCEL) | None => Ok(PreviewState::Cancelled),
                    Some(choice) if choice - FIRST_FILE < entries.len() => {
                        Ok(PreviewState::InspectingFile {
                            current_branch,
                            entries,
                            index: choice - FIRST_FILE,
                        })
                    }
                    Some(_) => Ok(PreviewState::Cancelled),
                }
            }

            PreviewState::InspectingFile {
                current_branch,
                entries,
                index,
            } => {
                let path = &entries[index].path;
                if let Err(e) = self
                    .surface
                    .open_side_by_side_diff(repo, path, commit_hash, &current_branch)
                    .await
                {
                    warn!("Failed to open diff for {}: {}", path, e);
                }

                Ok(PreviewState::PreviewingFileList {
                    current_branch,
                    entries,
                })
            }

            terminal => Ok(terminal),
        }
    }

    async fn decide(&self, prompt: &str) -> Result<PreviewState> {
        if self.surface.confirm(prompt).await? {
            Ok(PreviewState::Confirmed)
        } else {
            Ok(PreviewState::Cancelled)
        }
    }
}

/// Menu shown while previewing: restore, cancel, then one entry per file
fn menu_options(entries: &[DiffEntry]) -> Vec<String> {
    let mut options = Vec::with_capacity(entries.len() + FIRST_FILE);
    options.push("Restore now".to_string());
    options.push("Cancel".to_string());
    options.extend(entries.iter().map(|e| format!("Inspect {}", e)));
    options
}

fn state_name(state: &PreviewState) -> &'static str {
    match state {
        PreviewState::Idle => "idle",
        PreviewState::PreviewingFileList { .. } => "previewing",
        PreviewState::InspectingFile { .. } => "inspecting",
        PreviewState::Confirmed => "confirmed",
        PreviewState::Cancelled => "cancelled",
    }
}
