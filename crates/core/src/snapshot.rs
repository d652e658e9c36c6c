//! Progress snapshot model - what observers receive.

use crate::id::{ProjectId, RunKey};
use crate::Time;
use serde::{Deserialize, Serialize};

/// Computed progress of one propagation run at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    /// Run the snapshot belongs to
    pub run_key: RunKey,

    /// Share of scheduled projects no longer pending (0-100)
    pub project_progress_pct: u8,

    /// Projects ever scheduled in this run
    pub total_project_count: u64,

    /// Projects whose latest terminal signal was a failure
    pub failed_project_ids: Vec<ProjectId>,

    /// Share of merge requests no longer pending (0-100)
    pub merge_request_progress_pct: u8,

    /// Merge requests ever scheduled in this run
    pub total_merge_request_count: u64,

    /// Whether the run is still in progress
    pub in_progress: bool,

    /// When the snapshot was computed
    pub computed_at: Time,
}

impl ProgressSnapshot {
    /// Whether every scheduled project and merge request has reported back.
    pub fn is_complete(&self) -> bool {
        self.project_progress_pct == 100
            && (self.total_merge_request_count == 0 || self.merge_request_progress_pct == 100)
    }

    /// Number of failed projects.
    pub fn failed_count(&self) -> usize {
        self.failed_project_ids.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> ProgressSnapshot {
        ProgressSnapshot {
            run_key: RunKey::from(1),
            project_progress_pct: 100,
            total_project_count: 4,
            failed_project_ids: vec![ProjectId(2)],
            merge_request_progress_pct: 0,
            total_merge_request_count: 0,
            in_progress: true,
            computed_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_complete_without_merge_requests() {
        let snap = snapshot();
        assert!(snap.is_complete());
        assert_eq!(snap.failed_count(), 1);
    }

    #[test]
    fn test_incomplete_with_pending_merge_requests() {
        let mut snap = snapshot();
        snap.total_merge_request_count = 2;
        snap.merge_request_progress_pct = 50;
        assert!(!snap.is_complete());
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(snapshot()).unwrap();
        assert_eq!(json["runKey"], "1");
        assert_eq!(json["projectProgressPct"], 100);
        assert_eq!(json["failedProjectIds"][0], 2);
    }
}
