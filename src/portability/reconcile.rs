//! Reconciling an imported history with the current ledger

use std::fmt;
use std::str::FromStr;

use super::document::ExportDocument;
use crate::ledger::{Ledger, normalize, record_count};

/// How an imported history combines with the current one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportStrategy {
    /// Add imported records that are not already tracked
    #[default]
    Merge,
    /// Discard the current ledger and adopt the imported one
    Replace,
}

impl ImportStrategy {
    pub const ALL: [ImportStrategy; 2] = [ImportStrategy::Merge, ImportStrategy::Replace];

    pub fn describe(&self) -> &'static str {
        match self {
            Self::Merge => "Merge with existing history",
            Self::Replace => "Replace existing history",
        }
    }
}

impl fmt::Display for ImportStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Merge => write!(f, "merge"),
            Self::Replace => write!(f, "replace"),
        }
    }
}

impl FromStr for ImportStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "merge" => Ok(Self::Merge),
            "replace" => Ok(Self::Replace),
            other => Err(format!(
                "unknown import strategy '{}' (expected merge or replace)",
                other
            )),
        }
    }
}

/// Result of reconciling an import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOutcome {
    /// The ledger to adopt
    pub ledger: Ledger,
    /// Records that were not tracked before
    pub added: usize,
}

/// Combine a validated document with the current ledger
///
/// Pure: the caller decides whether to adopt `ImportOutcome::ledger`.
pub fn import_all(
    document: &ExportDocument,
    strategy: ImportStrategy,
    current: &Ledger,
) -> ImportOutcome {
    match strategy {
        ImportStrategy::Replace => {
            let ledger = normalize(document.deletion_history.clone());
            let added = record_count(&ledger);
            ImportOutcome { ledger, added }
        }
        ImportStrategy::Merge => {
            let (ledger, added) = merge(current, &document.deletion_history);
            ImportOutcome { ledger, added }
        }
    }
}

/// Add every imported record whose `(branch, commit)` is not yet tracked
///
/// Repositories absent from `imported` are left untouched. When both sides
/// hold the same event, the one already in `current` wins.
pub fn merge(current: &Ledger, imported: &Ledger) -> (Ledger, usize) {
    let mut merged = current.clone();
    let mut added = 0;

    for (repo, records) in imported {
        let target = merged.entry(repo.clone()).or_default();
        for record in records {
            if !target.iter().any(|r| r.same_event(record)) {
                target.push(record.clone());
                added += 1;
            }
        }
    }

    (normalize(merged), added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{DeletionRecord, DeletionSource};
    use crate::portability::export_all;
    use chrono::{Duration, Utc};
    use pretty_assertions::assert_eq;

    fn rec(name: &str, hash: &str, days_ago: i64) -> DeletionRecord {
        DeletionRecord::at(
            name,
            hash,
            Utc::now() - Duration::days(days_ago),
            DeletionSource::UserInitiated,
        )
    }

    fn ledger(entries: &[(&str, Vec<DeletionRecord>)]) -> Ledger {
        entries
            .iter()
            .map(|(repo, records)| (repo.to_string(), records.clone()))
            .collect()
    }

    #[test]
    fn test_replace_round_trip() {
        let original = ledger(&[
            ("/a", vec![rec("x", "111", 1), rec("y", "222", 2)]),
            ("/b", vec![rec("z", "333", 3)]),
        ]);
        let other = ledger(&[("/c", vec![rec("w", "444", 1)])]);

        let outcome = import_all(&export_all(&original), ImportStrategy::Replace, &other);

        assert_eq!(outcome.ledger, original);
        assert_eq!(outcome.added, 3);
    }

    #[test]
    fn test_merge_adds_only_new_events() {
        let current = ledger(&[
            ("/a", vec![rec("x", "111", 1)]),
            ("/keep", vec![rec("k", "999", 1)]),
        ]);
        let imported = ledger(&[("/a", vec![rec("x", "111", 5), rec("x", "222", 6)])]);

        let (merged, added) = merge(&current, &imported);

        assert_eq!(added, 1);
        assert_eq!(merged["/a"].len(), 2);
        // Existing record keeps its own timestamp
        assert_eq!(merged["/a"][0], current["/a"][0]);
        assert_eq!(merged["/keep"], current["/keep"]);
    }

    #[test]
    fn test_merge_into_empty() {
        let imported = ledger(&[("/a", vec![rec("x", "111", 1)])]);
        let (merged, added) = merge(&Ledger::new(), &imported);
        assert_eq!(added, 1);
        assert_eq!(merged, imported);
    }

    #[test]
    fn test_merge_drops_empty_imported_repos() {
        let imported = ledger(&[("/empty", Vec::new())]);
        let (merged, added) = merge(&Ledger::new(), &imported);
        assert_eq!(added, 0);
        assert!(merged.is_empty());
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!("merge".parse::<ImportStrategy>(), Ok(ImportStrategy::Merge));
        assert_eq!("Replace".parse::<ImportStrategy>(), Ok(ImportStrategy::Replace));
        assert!("append".parse::<ImportStrategy>().is_err());
        assert_eq!(ImportStrategy::Replace.to_string(), "replace");
    }
}
