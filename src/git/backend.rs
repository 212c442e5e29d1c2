//! Repository reads using gitoxide
//!
//! Discovery and ref lookups go through gitoxide; anything that mutates the
//! repository goes through the git CLI in [`super::GitCli`].

use std::path::{Path, PathBuf};

use gix::Repository;
use tracing::{debug, instrument};

use crate::error::{GitError, Result};

/// Read-only view of a repository
pub struct GitBackend {
    /// The gitoxide repository handle
    repo: Repository,
    /// Path to the working copy
    path: PathBuf,
}

impl GitBackend {
    /// Open an existing repository
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let repo = gix::open(&path).map_err(|e| {
            if e.to_string().contains("not a git repository") {
                GitError::NotARepository(path.clone())
            } else {
                GitError::Gix(e.to_string())
            }
        })?;

        Ok(Self { repo, path })
    }

    /// Discover repository from a path (searches parent directories)
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn discover(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let repo = gix::discover(path).map_err(|_e| GitError::NotARepository(path.to_path_buf()))?;

        let repo_path = repo
            .path()
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| path.to_path_buf());

        debug!("Discovered repository at {:?}", repo_path);

        Ok(Self {
            repo,
            path: repo_path,
        })
    }

    /// Get the working-copy path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the current branch name
    pub fn current_branch(&self) -> Result<String> {
        let head = self.repo.head().map_err(|e| GitError::Gix(e.to_string()))?;

        match head.kind {
            gix::head::Kind::Symbolic(reference) => Ok(reference.name.shorten().to_string()),
            gix::head::Kind::Detached { .. } => {
                // Detached HEAD has no branch name; diff against the commit itself
                match head.id() {
                    Some(id) => Ok(id.to_string()),
                    None => Err(GitError::InvalidRef("HEAD has no commits".to_string()).into()),
                }
            }
            gix::head::Kind::Unborn(full_name) => Ok(full_name.shorten().to_string()),
        }
    }

    /// Whether `refs/heads/<branch_name>` exists
    pub fn branch_exists(&self, branch_name: &str) -> Result<bool> {
        let full_name = format!("refs/heads/{}", branch_name);
        let found = self
            .repo
            .try_find_reference(full_name.as_str())
            .map_err(|e| GitError::Gix(e.to_string()))?;
        Ok(found.is_some())
    }
}
