//! Command runner capability
//!
//! Every git interaction the restore flow needs goes through `CommandRunner`,
//! so tests can script git without a repository.

use std::fmt;
use std::path::Path;

use async_trait::async_trait;

use crate::error::{GitError, Result};

/// Kind of change a file underwent between two refs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
    Renamed,
}

impl ChangeKind {
    /// Parse a `git diff --name-status` status letter (`M`, `R100`, ...)
    pub fn from_status(status: &str) -> Option<Self> {
        match status.chars().next()? {
            'A' | 'C' => Some(Self::Added),
            'M' | 'T' => Some(Self::Modified),
            'D' => Some(Self::Deleted),
            'R' => Some(Self::Renamed),
            _ => None,
        }
    }

    /// Single-letter marker for compact listings
    pub fn marker(&self) -> char {
        match self {
            Self::Added => 'A',
            Self::Modified => 'M',
            Self::Deleted => 'D',
            Self::Renamed => 'R',
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added => write!(f, "added"),
            Self::Modified => write!(f, "modified"),
            Self::Deleted => write!(f, "deleted"),
            Self::Renamed => write!(f, "renamed"),
        }
    }
}

/// One file in a file-level diff
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffEntry {
    /// Path on the `ref_b` side
    pub path: String,
    pub kind: ChangeKind,
    /// Previous path for renames
    pub old_path: Option<String>,
}

impl DiffEntry {
    pub fn new(path: impl Into<String>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
            old_path: None,
        }
    }

    pub fn renamed(old_path: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: ChangeKind::Renamed,
            old_path: Some(old_path.into()),
        }
    }
}

impl fmt::Display for DiffEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.old_path {
            Some(old) => write!(f, "{} {} -> {}", self.kind.marker(), old, self.path),
            None => write!(f, "{} {}", self.kind.marker(), self.path),
        }
    }
}

/// Git operations on a working copy
///
/// Implementations must never run two commands against the same working-copy
/// path at once.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Full reflog text, newest entries first
    async fn read_reflog(&self, repo: &Path) -> Result<String>;

    /// Files that differ between `ref_a` and `ref_b`
    async fn diff_status(&self, repo: &Path, ref_a: &str, ref_b: &str) -> Result<Vec<DiffEntry>>;

    /// Full commit hash for a branch name, abbreviated hash or other ref
    async fn resolve_ref(&self, repo: &Path, name_or_ref: &str) -> Result<String>;

    /// Name of the checked-out branch
    async fn current_branch(&self, repo: &Path) -> Result<String>;

    /// Create `name` pointing at `commit_hash` without checking it out
    async fn create_branch(&self, repo: &Path, name: &str, commit_hash: &str) -> Result<()>;

    /// Whether a local branch called `name` exists
    async fn branch_exists(&self, repo: &Path, name: &str) -> Result<bool>;

    /// Delete a local branch; `force` also deletes unmerged branches
    async fn delete_branch(&self, repo: &Path, name: &str, force: bool) -> Result<()>;
}

/// Separates options from user-supplied refs on a git command line
pub const END_OF_OPTIONS: &str = "--end-of-options";

/// Refuse a ref or branch name that git would read as an option
pub fn reject_option_like(value: &str) -> Result<()> {
    if value.starts_with('-') {
        return Err(GitError::InvalidRef(value.to_string()).into());
    }
    Ok(())
}

/// Parse `git diff --name-status -z` output
///
/// Records are NUL separated: a status token followed by one path, or two
/// paths for renames and copies. Unknown statuses are skipped.
pub fn parse_name_status(output: &str) -> Vec<DiffEntry> {
    let mut entries = Vec::new();
    let mut fields = output.split('\0').filter(|f| !f.is_empty());

    while let Some(status) = fields.next() {
        let status = status.trim();
        let two_paths = status.starts_with('R') || status.starts_with('C');

        let Some(first) = fields.next() else {
            break;
        };

        let entry = if two_paths {
            let Some(second) = fields.next() else {
                break;
            };
            match ChangeKind::from_status(status) {
                Some(ChangeKind::Renamed) => DiffEntry::renamed(first, second),
                Some(kind) => DiffEntry::new(second, kind),
                None => continue,
            }
        } else {
            match ChangeKind::from_status(status) {
                Some(kind) => DiffEntry::new(first, kind),
                None => continue,
            }
        };

        entries.push(entry);
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_name_status() {
        let output = "M\0src/main.rs\0A\0src/new.rs\0D\0old.txt\0R087\0a.rs\0b.rs\0";

        let entries = parse_name_status(output);
        assert_eq!(
            entries,
            vec![
                DiffEntry::new("src/main.rs", ChangeKind::Modified),
                DiffEntry::new("src/new.rs", ChangeKind::Added),
                DiffEntry::new("old.txt", ChangeKind::Deleted),
                DiffEntry::renamed("a.rs", "b.rs"),
            ]
        );
    }

    #[test]
    fn test_parse_name_status_copy_and_type_change() {
        let output = "C100\0orig.rs\0copy.rs\0T\0link\0";

        let entries = parse_name_status(output);
        assert_eq!(
            entries,
            vec![
                DiffEntry::new("copy.rs", ChangeKind::Added),
                DiffEntry::new("link", ChangeKind::Modified),
            ]
        );
    }

    #[test]
    fn test_parse_name_status_paths_with_spaces() {
        let entries = parse_name_status("M\0docs/read me.md\0");
        assert_eq!(entries[0].path, "docs/read me.md");
    }

    #[test]
    fn test_parse_name_status_empty() {
        assert!(parse_name_status("").is_empty());
    }

    #[test]
    fn test_parse_name_status_skips_unknown() {
        let entries = parse_name_status("X\0weird\0M\0ok.rs\0");
        assert_eq!(entries, vec![DiffEntry::new("ok.rs", ChangeKind::Modified)]);
    }

    #[test]
    fn test_reject_option_like() {
        assert!(reject_option_like("main").is_ok());
        assert!(reject_option_like("abc1234").is_ok());
        assert!(reject_option_like("feature/x-1").is_ok());

        let err = reject_option_like("--output=/tmp/victim.txt").unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Git(GitError::InvalidRef(ref value)) if value == "--output=/tmp/victim.txt"
        ));
        assert!(reject_option_like("-D").is_err());
    }

    #[test]
    fn test_entry_display() {
        assert_eq!(DiffEntry::new("a.rs", ChangeKind::Added).to_string(), "A a.rs");
        assert_eq!(DiffEntry::renamed("a.rs", "b.rs").to_string(), "R a.rs -> b.rs");
    }
}
