//! Branch deletion discovery from reflog text
//!
//! Each reflog line starts with a commit hash, carries a free-text action and
//! usually a timestamp inside braces. Deletions are recognized by a fixed,
//! ordered set of matchers; the first one that matches a line wins.

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use tracing::debug;

use crate::ledger::short_hash;

/// Leading commit hash of a reflog line
static HASH_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?P<hash>[0-9a-fA-F]{7,64})\b").unwrap());

/// Innermost `{...}` groups
static BRACE_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{([^{}]*)\}").unwrap());

static LOCAL_DELETE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:branch: deleted|deleted branch|branch\s+(?-i:-d|--delete))\s+(?P<name>[^\s{}():,\-][^\s{}():,]*)",
    )
    .unwrap()
});

static FORCED_DELETE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\bbranch:?\s+(?:(?-i:-D)|-df|-fd|--delete\s+--force|--force\s+--delete|force-deleted)\s+(?P<name>[^\s{}():,\-][^\s{}():,]*)",
    )
    .unwrap()
});

static REMOTE_TRACKING_DELETE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:deleted remote-tracking branch|remote-tracking branch: deleted)\s+(?P<name>[^\s{}():,\-][^\s{}():,]*)",
    )
    .unwrap()
});

static REF_UPDATE_DELETE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\bupdate-ref\s+(?:-m\s+\S+\s+)?-d\s+(?P<name>[^\s{}():,\-][^\s{}():,]*)",
    )
    .unwrap()
});

/// Phrasings of a branch deletion, in matching priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeletionPattern {
    /// `branch: deleted feature-x` / `Deleted branch feature-x` / `branch -d feature-x`
    LocalDelete,
    /// `branch -D feature-x`
    ForcedDelete,
    /// `Deleted remote-tracking branch origin/feature-x`
    RemoteTrackingDelete,
    /// `update-ref -d refs/heads/feature-x`
    RefUpdateDelete,
}

impl DeletionPattern {
    /// Every pattern, highest priority first
    pub const ALL: [DeletionPattern; 4] = [
        Self::LocalDelete,
        Self::ForcedDelete,
        Self::RemoteTrackingDelete,
        Self::RefUpdateDelete,
    ];

    fn regex(&self) -> &'static Regex {
        match self {
            Self::LocalDelete => &LOCAL_DELETE,
            Self::ForcedDelete => &FORCED_DELETE,
            Self::RemoteTrackingDelete => &REMOTE_TRACKING_DELETE,
            Self::RefUpdateDelete => &REF_UPDATE_DELETE,
        }
    }

    /// Branch name this pattern finds in `action`, if any
    pub fn match_branch(&self, action: &str) -> Option<String> {
        let captures = self.regex().captures(action)?;
        let name = normalize_branch_name(captures.name("name")?.as_str());
        (!name.is_empty()).then_some(name)
    }
}

/// A deletion found in the reflog
///
/// Candidates are shown to the user but never written to the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflogCandidate {
    pub branch_name: String,
    /// Hash as it appears in the reflog (often abbreviated)
    pub commit_hash: String,
    /// `None` when the line carried no readable timestamp
    pub deleted_at: Option<DateTime<Utc>>,
    /// Which phrasing matched
    pub pattern: DeletionPattern,
}

impl ReflogCandidate {
    pub fn short_hash(&self) -> &str {
        short_hash(&self.commit_hash)
    }

    /// One-line summary for pickers
    pub fn label(&self) -> String {
        match self.deleted_at {
            Some(at) => format!(
                "{} ({}) deleted {}",
                self.branch_name,
                self.short_hash(),
                at.format("%Y-%m-%d %H:%M")
            ),
            None => format!("{} ({}) deleted at unknown time", self.branch_name, self.short_hash()),
        }
    }
}

/// Reflog parser
#[derive(Debug, Clone)]
pub struct ReflogScanner {
    patterns: Vec<DeletionPattern>,
}

impl Default for ReflogScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl ReflogScanner {
    /// Scanner using every known pattern
    pub fn new() -> Self {
        Self {
            patterns: DeletionPattern::ALL.to_vec(),
        }
    }

    /// Deletion candidates in log order, one per `(branch, hash prefix)`
    ///
    /// The log is newest first, so the first occurrence of an event is kept.
    /// Lines that match nothing are skipped.
    pub fn scan(&self, text: &str) -> Vec<ReflogCandidate> {
        let mut seen: HashSet<(String, String)> = HashSet::new();
        let mut candidates = Vec::new();
        let mut lines = 0usize;

        for line in text.lines() {
            lines += 1;
            let Some(candidate) = self.parse_line(line) else {
                continue;
            };

            let key = (
                candidate.branch_name.clone(),
                candidate.short_hash().to_ascii_lowercase(),
            );
            if seen.insert(key) {
                candidates.push(candidate);
            }
        }

        debug!(
            "Scanned {} reflog lines, found {} deleted branches",
            lines,
            candidates.len()
        );
        candidates
    }

    /// Parse one line with the first matching pattern
    pub fn parse_line(&self, line: &str) -> Option<ReflogCandidate> {
        let hash_match = HASH_PATTERN.captures(line)?.name("hash")?;
        let rest = &line[hash_match.end()..];

        let (pattern, branch_name) = self
            .patterns
            .iter()
            .find_map(|p| p.match_branch(rest).map(|name| (*p, name)))?;

        Some(ReflogCandidate {
            branch_name,
            commit_hash: hash_match.as_str().to_string(),
            deleted_at: extract_timestamp(rest),
            pattern,
        })
    }
}

/// Convenience wrapper over [`ReflogScanner::scan`]
pub fn scan_reflog(text: &str) -> Vec<ReflogCandidate> {
    ReflogScanner::new().scan(text)
}

/// Strip ref prefixes and trailing punctuation from a matched name
fn normalize_branch_name(raw: &str) -> String {
    let name = raw
        .strip_prefix("refs/heads/")
        .or_else(|| raw.strip_prefix("refs/remotes/"))
        .unwrap_or(raw);
    name.trim_end_matches(['.', ';', '\'', '"'])
        .trim_start_matches(['\'', '"'])
        .to_string()
}

/// The last brace group on the line that reads as a timestamp
///
/// Purely numeric groups such as `HEAD@{0}` are reflog positions, not times.
fn extract_timestamp(line: &str) -> Option<DateTime<Utc>> {
    BRACE_PATTERN
        .captures_iter(line)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty() && !s.chars().all(|c| c.is_ascii_digit()))
        .filter_map(parse_timestamp)
        .last()
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    // --date=iso and git's default date format
    for format in ["%Y-%m-%d %H:%M:%S %z", "%a %b %e %H:%M:%S %Y %z"] {
        if let Ok(dt) = DateTime::parse_from_str(raw, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    // No offset given: read as UTC
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    None
}
