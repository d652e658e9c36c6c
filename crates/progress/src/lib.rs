//! Propagation Progress Tracking
//!
//! Live progress of fan-out policy propagation runs, kept in a shared
//! key-value store and published to observers as snapshots.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod estimator;
pub mod factory;
pub mod gate;
pub mod gated;
pub mod keys;
pub mod sink;
pub mod tracker;

#[cfg(test)]
mod test_support;

pub use config::{ClearPolicy, TrackerConfig};
pub use error::{Result, TrackerError};
pub use estimator::completion_pct;
pub use factory::TrackerFactory;
pub use gate::{EligibilityGate, FeatureGate, StaticGate};
pub use gated::GatedTracker;
pub use keys::RunKeys;
pub use sink::{BroadcastSink, FanoutSink, SnapshotSink, TracingSink};
pub use tracker::{StoreTracker, SyncTracker, TrackOutcome};
