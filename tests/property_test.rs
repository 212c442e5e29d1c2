//! Property-based tests for the ledger, retention, reconciliation and reflog parsing.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

use git_revive::config::MemoryStore;
use git_revive::git::scan_reflog;
use git_revive::ledger::{
    DeletionLedger, DeletionRecord, DeletionSource, Ledger, RetentionHorizon, prune,
};
use git_revive::portability::merge;

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
}

/// Short branch names so collisions actually happen
fn branch_name() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["main", "feature", "fix/login", "wip", "release-1.2"])
        .prop_map(str::to_string)
}

fn commit_hash() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop::sample::select(vec!['0', '1', '2', 'a', 'b', 'f']),
        8,
    )
    .prop_map(|chars| chars.into_iter().collect())
}

fn record(now: DateTime<Utc>) -> impl Strategy<Value = DeletionRecord> {
    (branch_name(), commit_hash(), 0i64..400 * 24).prop_map(move |(name, hash, hours)| {
        DeletionRecord::at(
            name,
            hash,
            now - Duration::hours(hours),
            DeletionSource::UserInitiated,
        )
    })
}

fn ledger(now: DateTime<Utc>) -> impl Strategy<Value = Ledger> {
    prop::collection::btree_map(
        prop::sample::select(vec!["/a", "/b", "/c"]).prop_map(str::to_string),
        prop::collection::vec(record(now), 0..8),
        0..3,
    )
}

/// The `(repo, branch, commit)` keys present in a ledger
fn event_keys(ledger: &Ledger) -> BTreeSet<(String, String, String)> {
    ledger
        .iter()
        .flat_map(|(repo, records)| {
            records
                .iter()
                .map(move |r| (repo.clone(), r.branch_name.clone(), r.commit_hash.clone()))
        })
        .collect()
}

proptest! {
    /// No two records in one repository share a `(branch, commit)` pair.
    #[test]
    fn recording_keeps_events_unique(events in prop::collection::vec((branch_name(), commit_hash()), 0..30)) {
        let mut ledger = DeletionLedger::new(MemoryStore::new(), RetentionHorizon::default());
        tokio_test::block_on(async {
            for (name, hash) in &events {
                ledger.record("/repo", name, hash, DeletionSource::UserInitiated).await;
            }
        });

        let records = ledger.list("/repo");
        let unique: BTreeSet<_> = records
            .iter()
            .map(|r| (r.branch_name.clone(), r.commit_hash.clone()))
            .collect();
        prop_assert_eq!(unique.len(), records.len());

        let expected: BTreeSet<_> = events.into_iter().collect();
        prop_assert_eq!(unique, expected);
    }

    /// Pruning twice with the same horizon changes nothing the second time.
    #[test]
    fn pruning_is_idempotent(snapshot in ledger(fixed_now()), days in 1u32..=365) {
        let horizon = RetentionHorizon::new(days).unwrap();
        let once = prune(&snapshot, horizon, fixed_now());
        let twice = prune(&once, horizon, fixed_now());
        prop_assert_eq!(once, twice);
    }

    /// A record survives exactly when it is younger than the horizon.
    #[test]
    fn pruning_respects_horizon(age_days in 0i64..400, days in 1u32..=365) {
        let now = fixed_now();
        // An hour short of a whole day keeps clear of the exact cutoff
        let deleted_at = now - Duration::days(age_days) + Duration::hours(1);
        let mut snapshot = Ledger::new();
        snapshot.insert(
            "/repo".to_string(),
            vec![DeletionRecord::at("b", "111", deleted_at, DeletionSource::UserInitiated)],
        );

        let pruned = prune(&snapshot, RetentionHorizon::new(days).unwrap(), now);
        prop_assert_eq!(pruned.contains_key("/repo"), age_days <= i64::from(days));
    }

    /// Merging in either order tracks the same events.
    #[test]
    fn merge_is_commutative(a in ledger(fixed_now()), b in ledger(fixed_now())) {
        let (ab, _) = merge(&a, &b);
        let (ba, _) = merge(&b, &a);
        prop_assert_eq!(event_keys(&ab), event_keys(&ba));
    }

    /// The count a merge reports matches what it actually added.
    #[test]
    fn merge_count_matches_growth(current in ledger(fixed_now()), imported in ledger(fixed_now())) {
        let before = event_keys(&current).len();
        let (merged, added) = merge(&current, &imported);
        prop_assert_eq!(event_keys(&merged).len(), before + added);
    }

    /// Arbitrary text never panics and never yields a repeated deletion.
    #[test]
    fn reflog_scan_is_total(lines in prop::collection::vec(".{0,80}", 0..40)) {
        let text = lines.join("\n");
        let candidates = scan_reflog(&text);

        let keys: BTreeSet<_> = candidates
            .iter()
            .map(|c| (c.branch_name.clone(), c.short_hash().to_ascii_lowercase()))
            .collect();
        prop_assert_eq!(keys.len(), candidates.len());
    }

    /// Every well-formed deletion line is recognized.
    #[test]
    fn reflog_deletion_lines_are_found(name in "[a-z][a-z0-9_/-]{0,20}", hash in "[0-9a-f]{7,40}") {
        let line = format!("{} HEAD@{{0}}: branch: deleted {}", hash, name);
        let candidates = scan_reflog(&line);

        prop_assert_eq!(candidates.len(), 1);
        prop_assert_eq!(&candidates[0].branch_name, &name);
        prop_assert_eq!(&candidates[0].commit_hash, &hash);
    }
}
