//! Resolves trackers for explicit run keys.

use proptrack_core::RunKey;
use proptrack_storage::KeyValueStore;
use std::sync::Arc;

use crate::config::TrackerConfig;
use crate::gate::{EligibilityGate, StaticGate};
use crate::gated::GatedTracker;
use crate::sink::{SnapshotSink, TracingSink};
use crate::tracker::StoreTracker;

/// Holds the collaborators shared by every run and hands out bound trackers.
///
/// Cheap to clone; dispatchers and workers each keep one and ask it for the
/// tracker of the run they are working on.
#[derive(Clone)]
pub struct TrackerFactory {
    store: Arc<dyn KeyValueStore>,
    gate: Arc<dyn EligibilityGate>,
    sink: Arc<dyn SnapshotSink>,
    config: Arc<TrackerConfig>,
}

impl TrackerFactory {
    /// Create a factory over `store` that tracks every run and logs snapshots.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            gate: Arc::new(StaticGate(true)),
            sink: Arc::new(TracingSink),
            config: Arc::new(TrackerConfig::default()),
        }
    }

    /// Set the eligibility gate.
    pub fn with_gate(mut self, gate: Arc<dyn EligibilityGate>) -> Self {
        self.gate = gate;
        self
    }

    /// Set the snapshot sink.
    pub fn with_sink(mut self, sink: Arc<dyn SnapshotSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: TrackerConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    /// Configuration in effect.
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Gated tracker bound to `run_key`.
    pub fn tracker(&self, run_key: RunKey) -> GatedTracker<StoreTracker> {
        GatedTracker::new(self.ungated(run_key), self.gate.clone())
    }

    /// Tracker bound to `run_key` that skips the eligibility gate.
    pub fn ungated(&self, run_key: RunKey) -> StoreTracker {
        StoreTracker::new(
            run_key,
            self.store.clone(),
            self.sink.clone(),
            &self.config,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClearPolicy;
    use crate::test_support::RecordingSink;
    use crate::tracker::SyncTracker;
    use proptrack_core::ProjectId;
    use proptrack_storage::MemoryStore;

    #[tokio::test]
    async fn test_trackers_for_same_run_share_state() {
        let store = Arc::new(MemoryStore::new());
        let sink = Arc::new(RecordingSink::default());
        let factory = TrackerFactory::new(store).with_sink(sink.clone());

        let dispatcher = factory.tracker(RunKey::from(5));
        let worker = factory.tracker(RunKey::from(5));

        dispatcher
            .register_projects(&[ProjectId(1), ProjectId(2)])
            .await
            .unwrap();
        worker.finish_project(ProjectId(1)).await.unwrap();

        assert_eq!(sink.last().unwrap().project_progress_pct, 50);
        assert!(dispatcher.is_sync_in_progress().await.unwrap());
    }

    #[tokio::test]
    async fn test_gate_applies_per_run() {
        let store = Arc::new(MemoryStore::new());
        let factory = TrackerFactory::new(store.clone())
            .with_sink(Arc::new(RecordingSink::default()))
            .with_gate(Arc::new(crate::gate::FeatureGate::new(true, |run| {
                run.as_str() == "1"
            })));

        factory
            .tracker(RunKey::from(1))
            .start_sync()
            .await
            .unwrap();
        let outcome = factory
            .tracker(RunKey::from(2))
            .start_sync()
            .await
            .unwrap();

        assert!(!outcome.is_tracked());
        assert_eq!(store.keys().await, vec!["policy_sync:1:active".to_string()]);
    }

    #[tokio::test]
    async fn test_config_prefix_applies() {
        let store = Arc::new(MemoryStore::new());
        let factory = TrackerFactory::new(store.clone())
            .with_sink(Arc::new(RecordingSink::default()))
            .with_config(TrackerConfig {
                key_prefix: "spp".to_string(),
                clear_policy: ClearPolicy::Everything,
                ..Default::default()
            });

        factory.ungated(RunKey::from(4)).start_sync().await.unwrap();

        assert_eq!(factory.config().clear_policy, ClearPolicy::Everything);
        assert_eq!(store.keys().await, vec!["spp:4:active".to_string()]);
    }
}
