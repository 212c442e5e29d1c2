//! Git CLI command runner
//!
//! Runs git as a subprocess with:
//! - One command at a time per working copy
//! - Timeout handling (a separate, shorter bound for reflog reads)
//! - Failures wrapped with the operation and its target

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use super::backend::GitBackend;
use super::runner::{
    CommandRunner, DiffEntry, END_OF_OPTIONS, parse_name_status, reject_option_like,
};
use crate::error::{GitError, Result};

/// Default timeout for git commands
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default timeout for reading the reflog of a large repository
pub const DEFAULT_REFLOG_TIMEOUT: Duration = Duration::from_secs(30);

/// `CommandRunner` backed by the `git` binary
#[derive(Clone)]
pub struct GitCli {
    /// Timeout for ordinary commands
    timeout: Duration,
    /// Timeout for reflog reads
    reflog_timeout: Duration,
    /// Per working-copy locks so commands on one path never overlap
    locks: Arc<Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>>,
}

impl GitCli {
    /// Create a runner with default timeouts
    pub fn new() -> Self {
        Self::with_timeouts(DEFAULT_TIMEOUT, DEFAULT_REFLOG_TIMEOUT)
    }

    /// Create a runner with custom timeouts
    pub fn with_timeouts(command_timeout: Duration, reflog_timeout: Duration) -> Self {
        Self {
            timeout: command_timeout,
            reflog_timeout,
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn path_lock(&self, repo: &Path) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(locks.entry(repo.to_path_buf()).or_default())
    }

    /// Run git in `repo` and return its stdout
    #[instrument(skip(self, repo, args), fields(repo = %repo.display(), args = ?args))]
    async fn run(
        &self,
        repo: &Path,
        operation: &str,
        target: &str,
        args: &[&str],
        limit: Duration,
    ) -> Result<String> {
        let lock = self.path_lock(repo);
        let _guard = lock.lock().await;

        let mut cmd = Command::new("git");
        cmd.current_dir(repo)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // output() drains stdout to the end, so multi-megabyte logs arrive whole
        match timeout(limit, cmd.output()).await {
            Ok(Ok(output)) => {
                if output.status.success() {
                    debug!("git {} read {} bytes", operation, output.stdout.len());
                    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
                } else {
                    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                    Err(GitError::CommandFailed {
                        operation: operation.to_string(),
                        target: target.to_string(),
                        stderr,
                    }
                    .into())
                }
            }
            Ok(Err(e)) => {
                warn!("git {} could not be started: {}", operation, e);
                Err(GitError::SpawnFailed {
                    operation: operation.to_string(),
                    target: target.to_string(),
                    reason: e.to_string(),
                }
                .into())
            }
            Err(_) => Err(GitError::Timeout {
                operation: operation.to_string(),
                target: target.to_string(),
                after: limit,
            }
            .into()),
        }
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

fn describe(repo: &Path, detail: &str) -> String {
    format!("{} ({})", repo.display(), detail)
}

#[async_trait]
impl CommandRunner for GitCli {
    async fn read_reflog(&self, repo: &Path) -> Result<String> {
        self.run(
            repo,
            "reflog",
            &repo.display().to_string(),
            &["reflog", "show", "--all", "--date=iso-strict"],
            self.reflog_timeout,
        )
        .await
    }

    async fn diff_status(&self, repo: &Path, ref_a: &str, ref_b: &str) -> Result<Vec<DiffEntry>> {
        reject_option_like(ref_a)?;
        reject_option_like(ref_b)?;
        let target = describe(repo, &format!("{}..{}", ref_a, ref_b));
        let output = self
            .run(
                repo,
                "diff",
                &target,
                &["diff", "--name-status", "-z", END_OF_OPTIONS, ref_a, ref_b, "--"],
                self.timeout,
            )
            .await?;

        Ok(parse_name_status(&output))
    }

    async fn resolve_ref(&self, repo: &Path, name_or_ref: &str) -> Result<String> {
        reject_option_like(name_or_ref)?;
        let spec = format!("{}^{{commit}}", name_or_ref);
        let output = self
            .run(
                repo,
                "rev-parse",
                &describe(repo, name_or_ref),
                &["rev-parse", "--verify", "--quiet", END_OF_OPTIONS, &spec],
                self.timeout,
            )
            .await?;

        let hash = output.trim();
        if hash.is_empty() {
            return Err(GitError::InvalidRef(name_or_ref.to_string()).into());
        }
        Ok(hash.to_string())
    }

    async fn current_branch(&self, repo: &Path) -> Result<String> {
        let lock = self.path_lock(repo);
        let _guard = lock.lock().await;

        let branch = GitBackend::open(repo)?.current_branch()?;
        Ok(branch)
    }

    async fn create_branch(&self, repo: &Path, name: &str, commit_hash: &str) -> Result<()> {
        reject_option_like(name)?;
        reject_option_like(commit_hash)?;
        self.run(
            repo,
            "branch",
            &describe(repo, &format!("{} at {}", name, commit_hash)),
            &["branch", END_OF_OPTIONS, name, commit_hash],
            self.timeout,
        )
        .await?;
        Ok(())
    }

    async fn branch_exists(&self, repo: &Path, name: &str) -> Result<bool> {
        let lock = self.path_lock(repo);
        let _guard = lock.lock().await;

        let exists = GitBackend::open(repo)?.branch_exists(name)?;
        Ok(exists)
    }

    async fn delete_branch(&self, repo: &Path, name: &str, force: bool) -> Result<()> {
        reject_option_like(name)?;
        let flag = if force { "-D" } else { "-d" };
        self.run(
            repo,
            if force { "branch -D" } else { "branch -d" },
            &describe(repo, name),
            &["branch", flag, END_OF_OPTIONS, name],
            self.timeout,
        )
        .await?;
        Ok(())
    }
}
