//! Simulated propagation run: one dispatcher, many concurrent workers.

use anyhow::Result;
use proptrack_core::{MergeRequestId, ProgressSnapshot, ProjectId, RunKey};
use proptrack_progress::{SyncTracker, TrackerFactory};
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, info};

/// Shape of the simulated fan-out.
#[derive(Debug, Clone)]
pub struct SimulationPlan {
    /// Run to track
    pub run_key: RunKey,
    /// Projects receiving the policy
    pub projects: u64,
    /// Projects registered per dispatcher batch
    pub batch_size: usize,
    /// Merge requests re-evaluated
    pub merge_requests: u64,
    /// Workers per merge request
    pub workers_per_merge_request: u32,
    /// Every n-th project fails (0 = none)
    pub fail_every: u64,
}

/// What the run looked like once every worker reported back.
#[derive(Debug, Clone)]
pub struct SimulationReport {
    /// Snapshot taken after all workers finished, before clearing
    pub final_snapshot: Option<ProgressSnapshot>,
    /// Failed projects still readable after clearing
    pub failed_after_clear: Vec<ProjectId>,
    /// Whether the run still counted as in progress after clearing
    pub in_progress_after_clear: bool,
}

/// Deterministic per-item work time, so workers finish out of order.
fn work_time(id: u64) -> Duration {
    Duration::from_millis((id * 7919) % 13)
}

pub async fn run(plan: &SimulationPlan, factory: &TrackerFactory) -> Result<SimulationReport> {
    let tracker = factory.tracker(plan.run_key.clone());
    let outcome = tracker.start_sync().await?;
    info!(run = %plan.run_key, tracked = outcome.is_tracked(), "simulation started");

    let mut workers = JoinSet::new();

    let ids: Vec<ProjectId> = (1..=plan.projects).map(ProjectId).collect();
    for batch in ids.chunks(plan.batch_size.max(1)) {
        tracker.register_projects(batch).await?;
        for &id in batch {
            let worker = factory.tracker(plan.run_key.clone());
            let fail = plan.fail_every > 0 && id.get() % plan.fail_every == 0;
            workers.spawn(async move {
                tokio::time::sleep(work_time(id.get())).await;
                if fail {
                    worker.fail_project(id).await?;
                } else {
                    worker.finish_project(id).await?;
                }
                debug!(project = %id, fail, "project worker done");
                anyhow::Ok(())
            });
        }
    }

    for mr in (1..=plan.merge_requests).map(MergeRequestId) {
        tracker.start_merge_request(mr).await?;
        // Register every worker before any of them can finish.
        for _ in 0..plan.workers_per_merge_request {
            tracker.start_merge_request_worker(mr).await?;
        }
        for n in 0..plan.workers_per_merge_request {
            let worker = factory.tracker(plan.run_key.clone());
            workers.spawn(async move {
                tokio::time::sleep(work_time(mr.get() + u64::from(n))).await;
                worker.finish_merge_request_worker(mr).await?;
                anyhow::Ok(())
            });
        }
    }

    while let Some(joined) = workers.join_next().await {
        joined??;
    }

    let final_snapshot = tracker.progress().await?;
    tracker.finish_sync().await?;
    tracker.clear().await?;

    let report = SimulationReport {
        final_snapshot,
        failed_after_clear: tracker.failed_projects().await?,
        in_progress_after_clear: tracker.is_sync_in_progress().await?,
    };
    tracker.purge().await?;
    info!(run = %plan.run_key, "simulation finished");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptrack_progress::{BroadcastSink, StaticGate};
    use proptrack_storage::MemoryStore;
    use std::sync::Arc;

    fn plan() -> SimulationPlan {
        SimulationPlan {
            run_key: RunKey::from(1),
            projects: 12,
            batch_size: 5,
            merge_requests: 3,
            workers_per_merge_request: 2,
            fail_every: 4,
        }
    }

    #[tokio::test]
    async fn test_simulation_completes() {
        let store = Arc::new(MemoryStore::new());
        let sink = BroadcastSink::new(256);
        let mut snapshots = sink.subscribe();
        let factory = TrackerFactory::new(store.clone()).with_sink(Arc::new(sink));

        let report = run(&plan(), &factory).await.unwrap();

        let last = report.final_snapshot.unwrap();
        assert_eq!(last.total_project_count, 12);
        assert_eq!(last.project_progress_pct, 100);
        assert_eq!(last.total_merge_request_count, 3);
        assert_eq!(last.merge_request_progress_pct, 100);
        assert_eq!(
            report.failed_after_clear,
            vec![ProjectId(4), ProjectId(8), ProjectId(12)]
        );
        assert!(!report.in_progress_after_clear);
        assert!(store.is_empty().await);

        // 3 batches + 12 projects + 3 merge requests
        let mut published = 0;
        while snapshots.try_recv().is_ok() {
            published += 1;
        }
        assert_eq!(published, 18);
    }

    #[tokio::test]
    async fn test_simulation_untracked() {
        let store = Arc::new(MemoryStore::new());
        let factory = TrackerFactory::new(store.clone()).with_gate(Arc::new(StaticGate(false)));

        let report = run(&plan(), &factory).await.unwrap();

        assert!(report.final_snapshot.is_none());
        assert!(report.failed_after_clear.is_empty());
        assert!(store.is_empty().await);
    }
}
