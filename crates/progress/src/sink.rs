//! Snapshot sinks delivering progress to observers.

use proptrack_core::ProgressSnapshot;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, trace};

/// Receives every snapshot a tracker publishes.
///
/// Called synchronously from tracker operations. Delivery failures stay with
/// the sink; the tracker never learns about them.
pub trait SnapshotSink: Send + Sync {
    /// Deliver one snapshot.
    fn publish(&self, snapshot: ProgressSnapshot);
}

/// Emits snapshots as structured log events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl SnapshotSink for TracingSink {
    fn publish(&self, snapshot: ProgressSnapshot) {
        info!(
            run = %snapshot.run_key,
            project_pct = snapshot.project_progress_pct,
            total_projects = snapshot.total_project_count,
            failed_projects = snapshot.failed_count(),
            merge_request_pct = snapshot.merge_request_progress_pct,
            total_merge_requests = snapshot.total_merge_request_count,
            in_progress = snapshot.in_progress,
            "propagation progress"
        );
    }
}

/// Fans snapshots out to any number of async subscribers.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    sender: broadcast::Sender<ProgressSnapshot>,
}

impl BroadcastSink {
    /// Create a sink buffering up to `capacity` snapshots per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to snapshots published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressSnapshot> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl SnapshotSink for BroadcastSink {
    fn publish(&self, snapshot: ProgressSnapshot) {
        if self.sender.send(snapshot).is_err() {
            trace!("no snapshot subscribers");
        }
    }
}

/// Forwards each snapshot to several sinks in order.
#[derive(Clone, Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn SnapshotSink>>,
}

impl FanoutSink {
    /// Create an empty fan-out.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink.
    pub fn with(mut self, sink: Arc<dyn SnapshotSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl SnapshotSink for FanoutSink {
    fn publish(&self, snapshot: ProgressSnapshot) {
        for sink in &self.sinks {
            sink.publish(snapshot.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{snapshot, RecordingSink};

    #[tokio::test]
    async fn test_broadcast_delivers_to_subscribers() {
        let sink = BroadcastSink::new(8);
        let mut first = sink.subscribe();
        let mut second = sink.subscribe();
        assert_eq!(sink.subscriber_count(), 2);

        sink.publish(snapshot(40));

        assert_eq!(first.recv().await.unwrap().project_progress_pct, 40);
        assert_eq!(second.recv().await.unwrap().project_progress_pct, 40);
    }

    #[test]
    fn test_broadcast_without_subscribers_is_silent() {
        let sink = BroadcastSink::new(1);
        sink.publish(snapshot(10));
        assert_eq!(sink.subscriber_count(), 0);
    }

    #[test]
    fn test_fanout_forwards_in_order() {
        let a = Arc::new(RecordingSink::default());
        let b = Arc::new(RecordingSink::default());
        let fanout = FanoutSink::new().with(a.clone()).with(b.clone());

        fanout.publish(snapshot(5));
        fanout.publish(snapshot(6));

        assert_eq!(a.percentages(), vec![5, 6]);
        assert_eq!(b.percentages(), vec![5, 6]);
    }
}
