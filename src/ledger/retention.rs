//! Time-based retention of tracked deletions

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::types::Ledger;
use crate::error::{ConfigError, Result};

/// Maximum age of a tracked deletion, in whole days (1-365)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionHorizon(u32);

impl RetentionHorizon {
    pub const MIN_DAYS: u32 = 1;
    pub const MAX_DAYS: u32 = 365;
    pub const DEFAULT_DAYS: u32 = 90;

    /// Validate a configured number of days
    pub fn new(days: u32) -> Result<Self> {
        if (Self::MIN_DAYS..=Self::MAX_DAYS).contains(&days) {
            Ok(Self(days))
        } else {
            Err(ConfigError::InvalidValue {
                key: "retention_days".to_string(),
                reason: format!(
                    "{} is outside {}..={}",
                    days,
                    Self::MIN_DAYS,
                    Self::MAX_DAYS
                ),
            }
            .into())
        }
    }

    /// Clamp any number of days into range
    pub fn clamped(days: u32) -> Self {
        Self(days.clamp(Self::MIN_DAYS, Self::MAX_DAYS))
    }

    pub fn days(&self) -> u32 {
        self.0
    }

    /// Records deleted before this instant are expired
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(i64::from(self.0))
    }
}

impl Default for RetentionHorizon {
    fn default() -> Self {
        Self(Self::DEFAULT_DAYS)
    }
}

/// Drop every record deleted before `now - horizon`
///
/// Repositories left without records are dropped as well.
pub fn prune(snapshot: &Ledger, horizon: RetentionHorizon, now: DateTime<Utc>) -> Ledger {
    let cutoff = horizon.cutoff(now);

    snapshot
        .iter()
        .filter_map(|(repo, records)| {
            let kept: Vec<_> = records
                .iter()
                .filter(|r| r.deleted_at >= cutoff)
                .cloned()
                .collect();
            (!kept.is_empty()).then(|| (repo.clone(), kept))
        })
        .collect()
}

/// Total number of records across all repositories
pub fn record_count(ledger: &Ledger) -> usize {
    ledger.values().map(Vec::len).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{DeletionRecord, DeletionSource};

    fn ledger_with(records: Vec<DeletionRecord>) -> Ledger {
        let mut ledger = Ledger::new();
        ledger.insert("/repo".to_string(), records);
        ledger
    }

    #[test]
    fn test_horizon_range() {
        assert!(RetentionHorizon::new(0).is_err());
        assert!(RetentionHorizon::new(1).is_ok());
        assert!(RetentionHorizon::new(365).is_ok());
        assert!(RetentionHorizon::new(366).is_err());
        assert_eq!(RetentionHorizon::default().days(), 90);
        assert_eq!(RetentionHorizon::clamped(0).days(), 1);
        assert_eq!(RetentionHorizon::clamped(1000).days(), 365);
    }

    #[test]
    fn test_retention_boundary() {
        let now = Utc::now();
        let ten_days_old = DeletionRecord::at(
            "feature",
            "abc1234",
            now - Duration::days(10),
            DeletionSource::UserInitiated,
        );
        let ledger = ledger_with(vec![ten_days_old]);

        let short = prune(&ledger, RetentionHorizon::new(5).unwrap(), now);
        assert_eq!(record_count(&short), 0);
        assert!(short.is_empty());

        let long = prune(&ledger, RetentionHorizon::new(15).unwrap(), now);
        assert_eq!(record_count(&long), 1);
    }

    #[test]
    fn test_prune_keeps_order_of_survivors() {
        let now = Utc::now();
        let ledger = ledger_with(vec![
            DeletionRecord::at("a", "1", now - Duration::days(1), DeletionSource::UserInitiated),
            DeletionRecord::at("b", "2", now - Duration::days(200), DeletionSource::UserInitiated),
            DeletionRecord::at("c", "3", now - Duration::days(2), DeletionSource::UserInitiated),
        ]);

        let pruned = prune(&ledger, RetentionHorizon::default(), now);
        let names: Vec<_> = pruned["/repo"].iter().map(|r| r.branch_name.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn test_prune_is_idempotent() {
        let now = Utc::now();
        let ledger = ledger_with(vec![
            DeletionRecord::at("a", "1", now - Duration::days(40), DeletionSource::UserInitiated),
            DeletionRecord::at("b", "2", now - Duration::days(20), DeletionSource::UserInitiated),
        ]);
        let horizon = RetentionHorizon::new(30).unwrap();

        let once = prune(&ledger, horizon, now);
        let twice = prune(&once, horizon, now);
        assert_eq!(once, twice);
        assert_eq!(record_count(&twice), 1);
    }
}
