//! Core ledger types
//!
//! - `DeletionRecord` is one deletion event for one branch
//! - `Ledger` maps a repository path to its deletion records

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of hash characters shown to users and used as a dedup prefix
pub const SHORT_HASH_LEN: usize = 7;

/// Shortest abbreviated hash git will resolve
pub const MIN_HASH_LEN: usize = 4;

/// SHA-256 object ids are 64 hex digits
pub const MAX_HASH_LEN: usize = 64;

/// How a deletion came to be known
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum DeletionSource {
    /// Deleted through this tool
    #[default]
    UserInitiated,
    /// Found by scanning the reflog
    ReflogDiscovered,
}

impl fmt::Display for DeletionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserInitiated => write!(f, "deleted here"),
            Self::ReflogDiscovered => write!(f, "from reflog"),
        }
    }
}

/// A single branch deletion event
///
/// Identity is the `(branch_name, commit_hash)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionRecord {
    /// Short ref name (`feature-x`, not `refs/heads/feature-x`)
    pub branch_name: String,
    /// Commit the branch pointed at when it was deleted
    pub commit_hash: String,
    /// When the deletion happened
    pub deleted_at: DateTime<Utc>,
    /// How the deletion was discovered
    #[serde(default)]
    pub source: DeletionSource,
}

impl DeletionRecord {
    /// Create a record stamped with the current time
    pub fn new(
        branch_name: impl Into<String>,
        commit_hash: impl Into<String>,
        source: DeletionSource,
    ) -> Self {
        Self::at(branch_name, commit_hash, Utc::now(), source)
    }

    /// Create a record with an explicit deletion time
    pub fn at(
        branch_name: impl Into<String>,
        commit_hash: impl Into<String>,
        deleted_at: DateTime<Utc>,
        source: DeletionSource,
    ) -> Self {
        Self {
            branch_name: branch_name.into(),
            commit_hash: commit_hash.into(),
            deleted_at,
            source,
        }
    }

    /// Whether this record is the deletion event `(branch_name, commit_hash)`
    pub fn is_event(&self, branch_name: &str, commit_hash: &str) -> bool {
        self.branch_name == branch_name && self.commit_hash == commit_hash
    }

    /// Same deletion event as `other`
    pub fn same_event(&self, other: &DeletionRecord) -> bool {
        self.is_event(&other.branch_name, &other.commit_hash)
    }

    /// Abbreviated commit hash for display
    pub fn short_hash(&self) -> &str {
        short_hash(&self.commit_hash)
    }

    /// Check both fields before they reach a git command line
    pub fn validate(&self) -> std::result::Result<(), String> {
        check_branch_name(&self.branch_name)?;
        check_commit_hash(&self.commit_hash)
    }
}

impl fmt::Display for DeletionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) deleted {} [{}]",
            self.branch_name,
            self.short_hash(),
            self.deleted_at.format("%Y-%m-%d %H:%M"),
            self.source
        )
    }
}

/// Repository path → deletion records in discovery order
pub type Ledger = BTreeMap<String, Vec<DeletionRecord>>;

/// Ledger key for a working-copy path
pub fn repo_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// First `SHORT_HASH_LEN` characters of a hash
pub fn short_hash(hash: &str) -> &str {
    hash.get(..SHORT_HASH_LEN).unwrap_or(hash)
}

/// Accept only `MIN_HASH_LEN` to `MAX_HASH_LEN` hex digits
pub fn check_commit_hash(hash: &str) -> std::result::Result<(), String> {
    if !(MIN_HASH_LEN..=MAX_HASH_LEN).contains(&hash.len()) {
        return Err(format!(
            "commit hash '{}' must be {} to {} hex digits",
            hash, MIN_HASH_LEN, MAX_HASH_LEN
        ));
    }
    if !hash.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(format!("commit hash '{}' is not hexadecimal", hash));
    }
    Ok(())
}

/// Accept only names git allows under `refs/heads/` that cannot pass for an option
pub fn check_branch_name(name: &str) -> std::result::Result<(), String> {
    let reason = if name.is_empty() {
        "is empty"
    } else if name.starts_with('-') {
        "starts with '-'"
    } else if name == "@" {
        "is '@'"
    } else if name.starts_with('/') || name.ends_with('/') || name.ends_with('.') {
        "starts or ends with a separator"
    } else if name.contains("..") || name.contains("@{") || name.contains("//") {
        "contains '..', '@{' or '//'"
    } else if name
        .chars()
        .any(|c| c.is_control() || c.is_whitespace() || "~^:?*[\\".contains(c))
    {
        "contains a character git forbids in ref names"
    } else if name
        .split('/')
        .any(|part| part.starts_with('.') || part.ends_with(".lock"))
    {
        "has a component starting with '.' or ending in '.lock'"
    } else {
        return Ok(());
    };

    Err(format!("branch name '{}' {}", name, reason))
}

/// Records ordered newest first, as lists are shown to users
pub fn sorted_for_display(records: &[DeletionRecord]) -> Vec<DeletionRecord> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| b.deleted_at.cmp(&a.deleted_at));
    sorted
}

/// Drop repeated events (keeping the first) and empty repositories
pub(crate) fn normalize(ledger: Ledger) -> Ledger {
    ledger
        .into_iter()
        .filter_map(|(repo, records)| {
            let mut unique: Vec<DeletionRecord> = Vec::with_capacity(records.len());
            for record in records {
                if !unique.iter().any(|r| r.same_event(&record)) {
                    unique.push(record);
                }
            }
            (!unique.is_empty()).then_some((repo, unique))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_record_serializes_camel_case() {
        let deleted_at = Utc.with_ymd_and_hms(2026, 1, 5, 9, 15, 0).unwrap();
        let record = DeletionRecord::at(
            "feature-y",
            "abc1234def",
            deleted_at,
            DeletionSource::UserInitiated,
        );

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["branchName"], "feature-y");
        assert_eq!(json["commitHash"], "abc1234def");
        assert_eq!(json["source"], "userInitiated");
        assert!(json["deletedAt"].as_str().unwrap().starts_with("2026-01-05T09:15:00"));
    }

    #[test]
    fn test_source_defaults_when_missing() {
        let json = r#"{"branchName":"x","commitHash":"abc","deletedAt":"2026-01-05T09:15:00.000Z"}"#;
        let record: DeletionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.source, DeletionSource::UserInitiated);
    }

    #[test]
    fn test_short_hash() {
        assert_eq!(short_hash("abc1234def5678"), "abc1234");
        assert_eq!(short_hash("abc"), "abc");
    }

    #[test]
    fn test_commit_hash_rules() {
        assert!(check_commit_hash("abc1").is_ok());
        assert!(check_commit_hash("ABC1234def").is_ok());
        assert!(check_commit_hash(&"f".repeat(64)).is_ok());

        assert!(check_commit_hash("abc").is_err());
        assert!(check_commit_hash(&"f".repeat(65)).is_err());
        assert!(check_commit_hash("--output=/tmp/victim.txt").is_err());
        assert!(check_commit_hash("HEAD~1").is_err());
    }

    #[test]
    fn test_branch_name_rules() {
        for ok in ["feature", "fix/login", "release-1.2", "user/jo_e/wip", "a-"] {
            assert!(check_branch_name(ok).is_ok(), "{ok} should be accepted");
        }

        for bad in [
            "", "-D", "--force", "@", "/lead", "trail/", "end.", "a..b", "a@{1}", "a//b",
            "has space", "tab\there", "caret^", "colon:", "star*", "q?", "br[ack", "back\\slash",
            ".hidden", "dir/.hidden", "x.lock", "dir/x.lock/y",
        ] {
            assert!(check_branch_name(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_record_validate() {
        let good = DeletionRecord::new("feature", "abc1234", DeletionSource::UserInitiated);
        assert!(good.validate().is_ok());

        let bad_hash = DeletionRecord::new("evil", "--output=/x", DeletionSource::UserInitiated);
        assert!(bad_hash.validate().is_err());

        let bad_name = DeletionRecord::new("-D", "abc1234", DeletionSource::UserInitiated);
        assert!(bad_name.validate().is_err());
    }

    #[test]
    fn test_sorted_for_display_newest_first() {
        let now = Utc::now();
        let records = vec![
            DeletionRecord::at("old", "1", now - Duration::days(3), DeletionSource::UserInitiated),
            DeletionRecord::at("new", "2", now, DeletionSource::UserInitiated),
            DeletionRecord::at("mid", "3", now - Duration::days(1), DeletionSource::UserInitiated),
        ];

        let names: Vec<_> = sorted_for_display(&records)
            .into_iter()
            .map(|r| r.branch_name)
            .collect();
        assert_eq!(names, vec!["new", "mid", "old"]);
    }

    #[test]
    fn test_normalize_drops_duplicates_and_empty_repos() {
        let mut ledger = Ledger::new();
        ledger.insert(
            "/a".to_string(),
            vec![
                DeletionRecord::new("x", "1", DeletionSource::UserInitiated),
                DeletionRecord::new("x", "1", DeletionSource::ReflogDiscovered),
                DeletionRecord::new("x", "2", DeletionSource::UserInitiated),
            ],
        );
        ledger.insert("/b".to_string(), Vec::new());

        let normalized = normalize(ledger);
        assert_eq!(normalized.len(), 1);
        assert_eq!(normalized["/a"].len(), 2);
        assert_eq!(normalized["/a"][0].source, DeletionSource::UserInitiated);
    }
}
