//! Deletion ledger - the authoritative record of tracked branch deletions
//!
//! Every mutation is applied in memory first and then written through to the
//! durable store. A failed write is logged and the ledger keeps working for
//! the rest of the session; the next successful write catches the store up.

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use super::retention::{self, RetentionHorizon};
use super::types::{DeletionRecord, DeletionSource, Ledger, normalize};
use crate::config::DurableStore;
use crate::error::{Result, StoreError};

/// Store key holding the serialized ledger
pub const LEDGER_KEY: &str = "deletedBranches";

/// Per-repository record of deleted branches, backed by a durable store
pub struct DeletionLedger<S> {
    store: S,
    entries: Ledger,
    horizon: RetentionHorizon,
    /// Flag the ledger key for cross-machine sync on load
    sync: bool,
    /// False once a write has failed and until the next one succeeds
    persistent: bool,
}

impl<S: DurableStore> DeletionLedger<S> {
    /// Create an empty ledger without touching the store
    pub fn new(store: S, horizon: RetentionHorizon) -> Self {
        Self {
            store,
            entries: Ledger::new(),
            horizon,
            sync: false,
            persistent: true,
        }
    }

    /// Flag the ledger for cross-machine sync
    pub fn with_sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }

    /// Create a ledger and load it from the store
    pub async fn open(store: S, horizon: RetentionHorizon, sync: bool) -> Self {
        let mut ledger = Self::new(store, horizon).with_sync(sync);
        ledger.load().await;
        ledger
    }

    /// Read the persisted ledger, then apply retention
    ///
    /// A missing or unreadable document leaves the ledger empty.
    #[instrument(skip(self))]
    pub async fn load(&mut self) {
        self.entries = match self.read_persisted().await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to load deletion ledger, starting empty: {}", e);
                Ledger::new()
            }
        };

        if self.sync {
            if let Err(e) = self.store.set_synced(LEDGER_KEY, true).await {
                warn!("Failed to flag deletion ledger for sync: {}", e);
            }
        }

        let pruned = self.apply_retention(self.horizon);
        if pruned > 0 {
            info!(
                "Pruned {} deletion record(s) older than {} days",
                pruned,
                self.horizon.days()
            );
            self.persist().await;
        }

        debug!(
            "Loaded {} deletion record(s) across {} repositories",
            retention::record_count(&self.entries),
            self.entries.len()
        );
    }

    async fn read_persisted(&self) -> Result<Ledger> {
        let Some(value) = self.store.get(LEDGER_KEY).await? else {
            return Ok(Ledger::new());
        };

        let ledger: Ledger = serde_json::from_value(value).map_err(|e| StoreError::Corrupt {
            key: LEDGER_KEY.to_string(),
            reason: e.to_string(),
        })?;

        Ok(normalize(retain_valid(ledger)))
    }

    /// Write the full ledger to the store
    pub async fn save(&mut self) -> Result<()> {
        let value = serde_json::to_value(&self.entries)
            .map_err(|e| StoreError::WriteFailed(format!("Failed to serialize ledger: {}", e)))?;

        match self.store.set(LEDGER_KEY, value).await {
            Ok(()) => {
                if !self.persistent {
                    info!("Deletion ledger is persisted again");
                }
                self.persistent = true;
                Ok(())
            }
            Err(e) => {
                self.persistent = false;
                Err(e)
            }
        }
    }

    /// Save, logging instead of failing
    async fn persist(&mut self) {
        if let Err(e) = self.save().await {
            warn!(
                "Failed to persist deletion ledger, tracking for this session only: {}",
                e
            );
        }
    }

    /// Whether the last write reached the store
    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    /// The horizon applied at load
    pub fn horizon(&self) -> RetentionHorizon {
        self.horizon
    }

    /// Track a deletion stamped with the current time
    ///
    /// Returns `false` if the same `(name, commit)` event is already tracked.
    pub async fn record(
        &mut self,
        repo: &str,
        branch_name: &str,
        commit_hash: &str,
        source: DeletionSource,
    ) -> bool {
        self.insert(repo, DeletionRecord::new(branch_name, commit_hash, source))
            .await
    }

    /// Track an existing record
    ///
    /// Deletion times in the future are clamped to now. Records whose name or
    /// hash git could misread are refused.
    #[instrument(skip(self, record), fields(branch = %record.branch_name))]
    pub async fn insert(&mut self, repo: &str, mut record: DeletionRecord) -> bool {
        if let Err(reason) = record.validate() {
            warn!("Refusing to track deletion in {}: {}", repo, reason);
            return false;
        }

        let now = Utc::now();
        if record.deleted_at > now {
            record.deleted_at = now;
        }

        let records = self.entries.entry(repo.to_string()).or_default();
        if records.iter().any(|r| r.same_event(&record)) {
            debug!("Deletion already tracked for {}", repo);
            return false;
        }

        records.push(record);
        self.persist().await;
        true
    }

    /// Snapshot of one repository's records in discovery order
    pub fn list(&self, repo: &str) -> Vec<DeletionRecord> {
        self.entries.get(repo).cloned().unwrap_or_default()
    }

    /// Find a tracked deletion of `branch_name`
    ///
    /// `commit_prefix` narrows the match to hashes starting with it. Without a
    /// prefix the most recent deletion of the branch is returned.
    pub fn find(
        &self,
        repo: &str,
        branch_name: &str,
        commit_prefix: Option<&str>,
    ) -> Option<DeletionRecord> {
        self.entries
            .get(repo)?
            .iter()
            .filter(|r| r.branch_name == branch_name)
            .filter(|r| commit_prefix.is_none_or(|prefix| r.commit_hash.starts_with(prefix)))
            .max_by_key(|r| r.deleted_at)
            .cloned()
    }

    /// Whether the exact event is tracked
    pub fn contains(&self, repo: &str, branch_name: &str, commit_hash: &str) -> bool {
        self.entries
            .get(repo)
            .is_some_and(|records| records.iter().any(|r| r.is_event(branch_name, commit_hash)))
    }

    /// Remove one deletion event
    pub async fn remove(&mut self, repo: &str, branch_name: &str, commit_hash: &str) -> bool {
        let Some(records) = self.entries.get_mut(repo) else {
            return false;
        };

        let before = records.len();
        records.retain(|r| !r.is_event(branch_name, commit_hash));
        if records.len() == before {
            return false;
        }

        if records.is_empty() {
            self.entries.remove(repo);
        }
        self.persist().await;
        true
    }

    /// Remove the oldest tracked deletion of `branch_name`
    pub async fn remove_by_name(&mut self, repo: &str, branch_name: &str) -> Option<DeletionRecord> {
        let oldest = self
            .entries
            .get(repo)?
            .iter()
            .filter(|r| r.branch_name == branch_name)
            .min_by_key(|r| r.deleted_at)
            .cloned()?;

        self.remove(repo, &oldest.branch_name, &oldest.commit_hash)
            .await
            .then_some(oldest)
    }

    /// Forget every deletion tracked for one repository
    pub async fn clear(&mut self, repo: &str) -> usize {
        let removed = self.entries.remove(repo).map(|r| r.len()).unwrap_or(0);
        if removed > 0 {
            self.persist().await;
        }
        removed
    }

    /// Forget every tracked deletion
    pub async fn clear_all(&mut self) -> usize {
        let removed = retention::record_count(&self.entries);
        self.entries.clear();
        self.persist().await;
        removed
    }

    /// Prune with a new horizon, e.g. after a configuration change
    ///
    /// Returns the number of records removed.
    pub async fn prune_now(&mut self, horizon: RetentionHorizon) -> usize {
        self.horizon = horizon;
        let pruned = self.apply_retention(horizon);
        if pruned > 0 {
            self.persist().await;
        }
        pruned
    }

    fn apply_retention(&mut self, horizon: RetentionHorizon) -> usize {
        let before = retention::record_count(&self.entries);
        self.entries = retention::prune(&self.entries, horizon, Utc::now());
        before - retention::record_count(&self.entries)
    }

    /// Copy of the whole ledger
    pub fn snapshot(&self) -> Ledger {
        self.entries.clone()
    }

    /// Replace the whole ledger, e.g. after an import
    ///
    /// Retention applies to the new contents. Returns the number of records
    /// pruned.
    pub async fn replace_all(&mut self, ledger: Ledger) -> usize {
        self.entries = normalize(retain_valid(ledger));
        let pruned = self.apply_retention(self.horizon);
        self.persist().await;
        pruned
    }

    /// Repositories with at least one tracked deletion
    pub fn repositories(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

/// Drop records that fail validation
fn retain_valid(ledger: Ledger) -> Ledger {
    ledger
        .into_iter()
        .map(|(repo, records)| {
            let records = records
                .into_iter()
                .filter(|record| match record.validate() {
                    Ok(()) => true,
                    Err(reason) => {
                        warn!("Dropping deletion record in {}: {}", repo, reason);
                        false
                    }
                })
                .collect();
            (repo, records)
        })
        .collect()
}
