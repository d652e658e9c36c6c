//! Store key layout for one run.

use proptrack_core::{MergeRequestId, RunKey};

/// Names of every key a run touches.
#[derive(Debug, Clone)]
pub struct RunKeys {
    base: String,
}

impl RunKeys {
    /// Keys for `run_key` under `prefix`.
    pub fn new(prefix: &str, run_key: &RunKey) -> Self {
        Self {
            base: format!("{}:{}", prefix, run_key),
        }
    }

    /// Flag set between start and finish of a sync.
    pub fn active(&self) -> String {
        format!("{}:active", self.base)
    }

    /// Set of projects still awaiting a terminal signal.
    pub fn pending_projects(&self) -> String {
        format!("{}:pending_projects", self.base)
    }

    /// Set of projects whose latest signal was a failure.
    pub fn failed_projects(&self) -> String {
        format!("{}:failed_projects", self.base)
    }

    /// Counter of projects ever scheduled.
    pub fn total_projects(&self) -> String {
        format!("{}:total_projects", self.base)
    }

    /// Set of merge requests with outstanding workers.
    pub fn pending_merge_requests(&self) -> String {
        format!("{}:pending_merge_requests", self.base)
    }

    /// Set of every merge request started in the run.
    pub fn merge_requests(&self) -> String {
        format!("{}:merge_requests", self.base)
    }

    /// Counter of merge requests ever scheduled.
    pub fn total_merge_requests(&self) -> String {
        format!("{}:total_merge_requests", self.base)
    }

    /// Outstanding worker count for one merge request.
    pub fn merge_request_workers(&self, id: MergeRequestId) -> String {
        format!("{}:merge_request_workers:{}", self.base, id)
    }
}
