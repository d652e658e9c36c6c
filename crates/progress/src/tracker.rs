//! Progress tracking service.
//!
//! [`StoreTracker`] keeps the bookkeeping of one propagation run in a shared
//! [`KeyValueStore`]. Any number of trackers, in any number of processes, may
//! work on the same run at once: every mutation is a single set toggle or an
//! atomic counter step, so concurrent and repeated signals interleave without
//! a transaction.

use async_trait::async_trait;
use proptrack_core::{MergeRequestId, ProgressSnapshot, ProjectId, RunKey};
use proptrack_storage::KeyValueStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{ClearPolicy, TrackerConfig};
use crate::error::{Result, TrackerError};
use crate::estimator::completion_pct;
use crate::keys::RunKeys;
use crate::sink::SnapshotSink;

/// Whether a tracker call touched the run at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackOutcome {
    /// The call was applied to the store
    Applied,
    /// Tracking is disabled for this run; nothing happened
    Untracked,
}

impl TrackOutcome {
    /// Whether the call was applied.
    pub fn is_tracked(self) -> bool {
        matches!(self, TrackOutcome::Applied)
    }
}

/// Progress tracking of one propagation run.
#[async_trait]
pub trait SyncTracker: Send + Sync {
    /// Run this tracker is bound to.
    fn run_key(&self) -> &RunKey;

    /// Mark the run as started, before any work is known.
    async fn start_sync(&self) -> Result<TrackOutcome>;

    /// Drop the started mark. Pending work keeps the run alive.
    async fn finish_sync(&self) -> Result<TrackOutcome>;

    /// Schedule a batch of projects. Publishes.
    async fn register_projects(&self, ids: &[ProjectId]) -> Result<TrackOutcome>;

    /// A project finished successfully. Publishes.
    async fn finish_project(&self, id: ProjectId) -> Result<TrackOutcome>;

    /// A project failed. Publishes.
    async fn fail_project(&self, id: ProjectId) -> Result<TrackOutcome>;

    /// Schedule a merge request.
    async fn start_merge_request(&self, id: MergeRequestId) -> Result<TrackOutcome>;

    /// A worker started on a merge request.
    async fn start_merge_request_worker(&self, id: MergeRequestId) -> Result<TrackOutcome>;

    /// A worker finished on a merge request. Publishes once the last one is done.
    async fn finish_merge_request_worker(&self, id: MergeRequestId) -> Result<TrackOutcome>;

    /// Whether the run is started or still has pending work.
    async fn is_sync_in_progress(&self) -> Result<bool>;

    /// Empty the pending sets (and, per config, failures and totals).
    async fn clear(&self) -> Result<TrackOutcome>;

    /// Reset failures and both totals.
    async fn reset_totals(&self) -> Result<TrackOutcome>;

    /// Remove every key of the run.
    async fn purge(&self) -> Result<TrackOutcome>;

    /// Current snapshot, without publishing it. `None` when untracked.
    async fn progress(&self) -> Result<Option<ProgressSnapshot>>;

    /// Failed projects, ascending.
    async fn failed_projects(&self) -> Result<Vec<ProjectId>>;
}

/// Tracker backed directly by the shared store.
///
/// Performs no eligibility checks; wrap it in a
/// [`GatedTracker`](crate::GatedTracker) for that.
#[derive(Clone)]
pub struct StoreTracker {
    run_key: RunKey,
    keys: RunKeys,
    store: Arc<dyn KeyValueStore>,
    sink: Arc<dyn SnapshotSink>,
    key_ttl: Option<Duration>,
    clear_policy: ClearPolicy,
}

impl StoreTracker {
    /// Create a tracker bound to `run_key`.
    pub fn new(
        run_key: RunKey,
        store: Arc<dyn KeyValueStore>,
        sink: Arc<dyn SnapshotSink>,
        config: &TrackerConfig,
    ) -> Self {
        Self {
            keys: RunKeys::new(&config.key_prefix, &run_key),
            run_key,
            store,
            sink,
            key_ttl: config.key_ttl(),
            clear_policy: config.clear_policy,
        }
    }

    /// Key layout of this run.
    pub fn keys(&self) -> &RunKeys {
        &self.keys
    }

    /// Recompute the snapshot and hand it to the sink, unless the run is idle.
    async fn publish(&self) -> Result<()> {
        if !self.in_progress().await? {
            debug!(run = %self.run_key, "run idle, snapshot suppressed");
            return Ok(());
        }
        let snapshot = self.build_snapshot(true).await?;
        self.sink.publish(snapshot);
        Ok(())
    }

    async fn build_snapshot(&self, in_progress: bool) -> Result<ProgressSnapshot> {
        let total_projects = self.read_counter(&self.keys.total_projects()).await?;
        let pending_projects = self
            .store
            .set_cardinality(&self.keys.pending_projects())
            .await? as u64;
        let total_merge_requests = self.read_counter(&self.keys.total_merge_requests()).await?;
        let pending_merge_requests = self
            .store
            .set_cardinality(&self.keys.pending_merge_requests())
            .await? as u64;

        Ok(ProgressSnapshot {
            run_key: self.run_key.clone(),
            project_progress_pct: completion_pct(total_projects, pending_projects),
            total_project_count: total_projects,
            failed_project_ids: self.read_failed().await?,
            merge_request_progress_pct: completion_pct(
                total_merge_requests,
                pending_merge_requests,
            ),
            total_merge_request_count: total_merge_requests,
            in_progress,
            computed_at: chrono::Utc::now(),
        })
    }

    async fn in_progress(&self) -> Result<bool> {
        if self.store.get(&self.keys.active()).await?.is_some() {
            return Ok(true);
        }
        if self.store.set_cardinality(&self.keys.pending_projects()).await? > 0 {
            return Ok(true);
        }
        Ok(self
            .store
            .set_cardinality(&self.keys.pending_merge_requests())
            .await?
            > 0)
    }

    /// Absent counters read as zero; negative ones are clamped.
    async fn read_counter(&self, key: &str) -> Result<u64> {
        match self.store.get(key).await? {
            None => Ok(0),
            Some(raw) => raw
                .parse::<i64>()
                .map(|n| n.max(0) as u64)
                .map_err(|_| TrackerError::CorruptValue {
                    key: key.to_string(),
                    value: raw,
                }),
        }
    }

    async fn read_failed(&self) -> Result<Vec<ProjectId>> {
        let key = self.keys.failed_projects();
        let mut ids = self
            .store
            .set_members(&key)
            .await?
            .into_iter()
            .map(|raw| {
                raw.parse::<ProjectId>()
                    .map_err(|_| TrackerError::CorruptValue {
                        key: key.clone(),
                        value: raw,
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        ids.sort();
        Ok(ids)
    }

    /// Create the worker counter at zero unless a worker already did, and
    /// record the merge request so `purge` can find the counter.
    async fn init_worker_counter(&self, id: MergeRequestId) -> Result<()> {
        self.store
            .set_add(&self.keys.merge_requests(), &id.to_string())
            .await?;
        self.store
            .set_if_absent(&self.keys.merge_request_workers(id), "0", self.key_ttl)
            .await?;
        Ok(())
    }

    fn total_keys(&self) -> Vec<String> {
        vec![
            self.keys.failed_projects(),
            self.keys.total_projects(),
            self.keys.total_merge_requests(),
        ]
    }
}

#[async_trait]
impl SyncTracker for StoreTracker {
    fn run_key(&self) -> &RunKey {
        &self.run_key
    }

    async fn start_sync(&self) -> Result<TrackOutcome> {
        self.store.set(&self.keys.active(), "1", self.key_ttl).await?;
        info!(run = %self.run_key, "propagation sync started");
        Ok(TrackOutcome::Applied)
    }

    async fn finish_sync(&self) -> Result<TrackOutcome> {
        self.store.delete(&[self.keys.active()]).await?;
        info!(run = %self.run_key, "propagation sync finished");
        Ok(TrackOutcome::Applied)
    }

    async fn register_projects(&self, ids: &[ProjectId]) -> Result<TrackOutcome> {
        if ids.is_empty() {
            return Ok(TrackOutcome::Applied);
        }
        let members: Vec<String> = ids.iter().map(ToString::to_string).collect();
        let added = self
            .store
            .set_add_many(&self.keys.pending_projects(), &members)
            .await?;
        // Counts dispatch volume, duplicates included.
        self.store
            .incr_by(&self.keys.total_projects(), ids.len() as i64)
            .await?;
        debug!(run = %self.run_key, batch = ids.len(), added, "projects registered");

        self.publish().await?;
        Ok(TrackOutcome::Applied)
    }

    async fn finish_project(&self, id: ProjectId) -> Result<TrackOutcome> {
        let member = id.to_string();
        let was_pending = self
            .store
            .set_remove(&self.keys.pending_projects(), &member)
            .await?;
        let was_failed = self
            .store
            .set_remove(&self.keys.failed_projects(), &member)
            .await?;
        debug!(run = %self.run_key, project = %id, was_pending, was_failed, "project finished");

        self.publish().await?;
        Ok(TrackOutcome::Applied)
    }

    async fn fail_project(&self, id: ProjectId) -> Result<TrackOutcome> {
        let member = id.to_string();
        self.store
            .set_add(&self.keys.failed_projects(), &member)
            .await?;
        let was_pending = self
            .store
            .set_remove(&self.keys.pending_projects(), &member)
            .await?;
        debug!(run = %self.run_key, project = %id, was_pending, "project failed");

        self.publish().await?;
        Ok(TrackOutcome::Applied)
    }

    async fn start_merge_request(&self, id: MergeRequestId) -> Result<TrackOutcome> {
        let member = id.to_string();
        let newly_added = self
            .store
            .set_add(&self.keys.pending_merge_requests(), &member)
            .await?;
        if newly_added {
            self.store
                .incr_by(&self.keys.total_merge_requests(), 1)
                .await?;
            self.init_worker_counter(id).await?;
        }
        debug!(run = %self.run_key, merge_request = %id, newly_added, "merge request started");
        Ok(TrackOutcome::Applied)
    }

    async fn start_merge_request_worker(&self, id: MergeRequestId) -> Result<TrackOutcome> {
        self.init_worker_counter(id).await?;
        let workers = self
            .store
            .incr_by(&self.keys.merge_request_workers(id), 1)
            .await?;
        debug!(run = %self.run_key, merge_request = %id, workers, "merge request worker started");
        Ok(TrackOutcome::Applied)
    }

    async fn finish_merge_request_worker(&self, id: MergeRequestId) -> Result<TrackOutcome> {
        let key = self.keys.merge_request_workers(id);
        let Some(workers) = self.store.decr_by_floored(&key, 1, 0).await? else {
            warn!(
                run = %self.run_key,
                merge_request = %id,
                "merge request worker finished more often than started"
            );
            return Ok(TrackOutcome::Applied);
        };
        if workers > 0 {
            debug!(
                run = %self.run_key,
                merge_request = %id,
                workers,
                "merge request workers outstanding"
            );
            return Ok(TrackOutcome::Applied);
        }

        self.store
            .set_remove(&self.keys.pending_merge_requests(), &id.to_string())
            .await?;
        debug!(run = %self.run_key, merge_request = %id, "merge request finished");

        self.publish().await?;
        Ok(TrackOutcome::Applied)
    }

    async fn is_sync_in_progress(&self) -> Result<bool> {
        self.in_progress().await
    }

    async fn clear(&self) -> Result<TrackOutcome> {
        let mut keys = vec![
            self.keys.pending_projects(),
            self.keys.pending_merge_requests(),
        ];
        if self.clear_policy == ClearPolicy::Everything {
            keys.extend(self.total_keys());
        }
        self.store.delete(&keys).await?;
        info!(run = %self.run_key, policy = ?self.clear_policy, "propagation state cleared");
        Ok(TrackOutcome::Applied)
    }

    async fn reset_totals(&self) -> Result<TrackOutcome> {
        self.store.delete(&self.total_keys()).await?;
        info!(run = %self.run_key, "propagation totals reset");
        Ok(TrackOutcome::Applied)
    }

    async fn purge(&self) -> Result<TrackOutcome> {
        let mut keys: Vec<String> = self
            .store
            .set_members(&self.keys.merge_requests())
            .await?
            .iter()
            .filter_map(|raw| raw.parse::<MergeRequestId>().ok())
            .map(|id| self.keys.merge_request_workers(id))
            .collect();
        keys.extend([
            self.keys.active(),
            self.keys.pending_projects(),
            self.keys.pending_merge_requests(),
            self.keys.merge_requests(),
        ]);
        keys.extend(self.total_keys());

        let removed = self.store.delete(&keys).await?;
        info!(run = %self.run_key, removed, "propagation state purged");
        Ok(TrackOutcome::Applied)
    }

    async fn progress(&self) -> Result<Option<ProgressSnapshot>> {
        let in_progress = self.in_progress().await?;
        Ok(Some(self.build_snapshot(in_progress).await?))
    }

    async fn failed_projects(&self) -> Result<Vec<ProjectId>> {
        self.read_failed().await
    }
}
