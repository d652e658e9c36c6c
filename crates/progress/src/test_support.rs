//! Test doubles shared by the unit tests of this crate.

use crate::sink::SnapshotSink;
use async_trait::async_trait;
use proptrack_core::{ProgressSnapshot, RunKey};
use proptrack_storage::{KeyValueStore, Result, StoreError};
use std::sync::Mutex;
use std::time::Duration;

/// Sink that keeps every snapshot it receives.
#[derive(Default)]
pub struct RecordingSink {
    snapshots: Mutex<Vec<ProgressSnapshot>>,
}

impl RecordingSink {
    pub fn snapshots(&self) -> Vec<ProgressSnapshot> {
        self.snapshots.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.snapshots.lock().unwrap().len()
    }

    pub fn last(&self) -> Option<ProgressSnapshot> {
        self.snapshots.lock().unwrap().last().cloned()
    }

    pub fn percentages(&self) -> Vec<u8> {
        self.snapshots()
            .iter()
            .map(|s| s.project_progress_pct)
            .collect()
    }
}

impl SnapshotSink for RecordingSink {
    fn publish(&self, snapshot: ProgressSnapshot) {
        self.snapshots.lock().unwrap().push(snapshot);
    }
}

/// Store whose every command fails as if the backend were down.
pub struct UnavailableStore;

fn down<T>() -> Result<T> {
    Err(StoreError::Unavailable("connection refused".to_string()))
}

#[async_trait]
impl KeyValueStore for UnavailableStore {
    async fn set_add(&self, _key: &str, _member: &str) -> Result<bool> {
        down()
    }

    async fn set_add_many(&self, _key: &str, _members: &[String]) -> Result<usize> {
        down()
    }

    async fn set_remove(&self, _key: &str, _member: &str) -> Result<bool> {
        down()
    }

    async fn set_members(&self, _key: &str) -> Result<Vec<String>> {
        down()
    }

    async fn set_cardinality(&self, _key: &str) -> Result<usize> {
        down()
    }

    async fn incr_by(&self, _key: &str, _by: i64) -> Result<i64> {
        down()
    }

    async fn decr_by_floored(&self, _key: &str, _by: i64, _floor: i64) -> Result<Option<i64>> {
        down()
    }

    async fn get(&self, _key: &str) -> Result<Option<String>> {
        down()
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Option<Duration>) -> Result<()> {
        down()
    }

    async fn set_if_absent(
        &self,
        _key: &str,
        _value: &str,
        _ttl: Option<Duration>,
    ) -> Result<bool> {
        down()
    }

    async fn delete(&self, _keys: &[String]) -> Result<usize> {
        down()
    }
}

/// Minimal snapshot with the given project percentage.
pub fn snapshot(project_pct: u8) -> ProgressSnapshot {
    ProgressSnapshot {
        run_key: RunKey::from(1),
        project_progress_pct: project_pct,
        total_project_count: 0,
        failed_project_ids: Vec::new(),
        merge_request_progress_pct: 0,
        total_merge_request_count: 0,
        in_progress: true,
        computed_at: chrono::Utc::now(),
    }
}
