//! Propagation tracking core data models.
//!
//! Identifiers shared by the store layer and the progress tracker, plus the
//! snapshot delivered to observers.

#![warn(missing_docs)]

mod id;
mod snapshot;

pub use id::{IdError, MergeRequestId, ProjectId, RunKey};
pub use snapshot::ProgressSnapshot;

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
