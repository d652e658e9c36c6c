//! Eligibility gates deciding whether a run is tracked at all.

use proptrack_core::RunKey;
use std::sync::atomic::{AtomicBool, Ordering};

/// Answers whether progress of a run should be tracked.
///
/// Consulted on every tracker call; the answer may change mid-run.
pub trait EligibilityGate: Send + Sync {
    /// Whether tracking is enabled for `run_key`.
    fn is_tracking_enabled(&self, run_key: &RunKey) -> bool;
}

/// Gate with a fixed answer.
#[derive(Debug, Clone, Copy)]
pub struct StaticGate(pub bool);

impl EligibilityGate for StaticGate {
    fn is_tracking_enabled(&self, _run_key: &RunKey) -> bool {
        self.0
    }
}

/// Global feature toggle combined with a per-run eligibility predicate.
pub struct FeatureGate {
    enabled: AtomicBool,
    eligible: Box<dyn Fn(&RunKey) -> bool + Send + Sync>,
}

impl FeatureGate {
    /// Create a gate; `eligible` is asked only while the toggle is on.
    pub fn new(enabled: bool, eligible: impl Fn(&RunKey) -> bool + Send + Sync + 'static) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            eligible: Box::new(eligible),
        }
    }

    /// Gate where every run is eligible.
    pub fn all(enabled: bool) -> Self {
        Self::new(enabled, |_| true)
    }

    /// Flip the global toggle.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Current state of the global toggle.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for FeatureGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureGate")
            .field("enabled", &self.is_enabled())
            .finish_non_exhaustive()
    }
}

impl EligibilityGate for FeatureGate {
    fn is_tracking_enabled(&self, run_key: &RunKey) -> bool {
        self.is_enabled() && (self.eligible)(run_key)
    }
}
