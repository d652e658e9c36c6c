//! Eligibility-gated tracker decorator.

use async_trait::async_trait;
use proptrack_core::{MergeRequestId, ProgressSnapshot, ProjectId, RunKey};
use std::sync::Arc;
use tracing::trace;

use crate::error::Result;
use crate::gate::EligibilityGate;
use crate::tracker::{SyncTracker, TrackOutcome};

/// Wraps a tracker so every call first asks an [`EligibilityGate`].
///
/// When the gate says no the call does nothing: no store command, no
/// publish. Mutations report [`TrackOutcome::Untracked`], queries report an
/// idle run.
pub struct GatedTracker<T> {
    inner: T,
    gate: Arc<dyn EligibilityGate>,
}

impl<T: SyncTracker> GatedTracker<T> {
    /// Gate `inner` behind `gate`.
    pub fn new(inner: T, gate: Arc<dyn EligibilityGate>) -> Self {
        Self { inner, gate }
    }

    /// The wrapped tracker.
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Whether tracking is currently enabled for this run.
    pub fn is_tracked(&self) -> bool {
        let enabled = self.gate.is_tracking_enabled(self.inner.run_key());
        if !enabled {
            trace!(run = %self.inner.run_key(), "tracking disabled, skipping");
        }
        enabled
    }
}

#[async_trait]
impl<T: SyncTracker> SyncTracker for GatedTracker<T> {
    fn run_key(&self) -> &RunKey {
        self.inner.run_key()
    }

    async fn start_sync(&self) -> Result<TrackOutcome> {
        if !self.is_tracked() {
            return Ok(TrackOutcome::Untracked);
        }
        self.inner.start_sync().await
    }

    async fn finish_sync(&self) -> Result<TrackOutcome> {
        if !self.is_tracked() {
            return Ok(TrackOutcome::Untracked);
        }
        self.inner.finish_sync().await
    }

    async fn register_projects(&self, ids: &[ProjectId]) -> Result<TrackOutcome> {
        if !self.is_tracked() {
            return Ok(TrackOutcome::Untracked);
        }
        self.inner.register_projects(ids).await
    }

    async fn finish_project(&self, id: ProjectId) -> Result<TrackOutcome> {
        if !self.is_tracked() {
            return Ok(TrackOutcome::Untracked);
        }
        self.inner.finish_project(id).await
    }

    async fn fail_project(&self, id: ProjectId) -> Result<TrackOutcome> {
        if !self.is_tracked() {
            return Ok(TrackOutcome::Untracked);
        }
        self.inner.fail_project(id).await
    }

    async fn start_merge_request(&self, id: MergeRequestId) -> Result<TrackOutcome> {
        if !self.is_tracked() {
            return Ok(TrackOutcome::Untracked);
        }
        self.inner.start_merge_request(id).await
    }

    async fn start_merge_request_worker(&self, id: MergeRequestId) -> Result<TrackOutcome> {
        if !self.is_tracked() {
            return Ok(TrackOutcome::Untracked);
        }
        self.inner.start_merge_request_worker(id).await
    }

    async fn finish_merge_request_worker(&self, id: MergeRequestId) -> Result<TrackOutcome> {
        if !self.is_tracked() {
            return Ok(TrackOutcome::Untracked);
        }
        self.inner.finish_merge_request_worker(id).await
    }

    async fn is_sync_in_progress(&self) -> Result<bool> {
        if !self.is_tracked() {
            return Ok(false);
        }
        self.inner.is_sync_in_progress().await
    }

    async fn clear(&self) -> Result<TrackOutcome> {
        if !self.is_tracked() {
            return Ok(TrackOutcome::Untracked);
        }
        self.inner.clear().await
    }

    async fn reset_totals(&self) -> Result<TrackOutcome> {
        if !self.is_tracked() {
            return Ok(TrackOutcome::Untracked);
        }
        self.inner.reset_totals().await
    }

    async fn purge(&self) -> Result<TrackOutcome> {
        if !self.is_tracked() {
            return Ok(TrackOutcome::Untracked);
        }
        self.inner.purge().await
    }

    async fn progress(&self) -> Result<Option<ProgressSnapshot>> {
        if !self.is_tracked() {
            return Ok(None);
        }
        self.inner.progress().await
    }

    async fn failed_projects(&self) -> Result<Vec<ProjectId>> {
        if !self.is_tracked() {
            return Ok(Vec::new());
        }
        self.inner.failed_projects().await
    }
}
