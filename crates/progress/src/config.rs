//! Tracker configuration.

use crate::error::{Result, TrackerError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// What `clear` removes besides the pending sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearPolicy {
    /// Only the pending sets; failures and totals stay readable for a final report
    #[default]
    PendingOnly,
    /// Pending sets, failures and totals
    Everything,
}

/// Configuration shared by every tracker built from one factory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Namespace prepended to every key
    pub key_prefix: String,
    /// Safety-net expiry for the active flag and worker counters, in seconds (0 = none)
    pub key_ttl_secs: u64,
    /// Scope of `clear`
    pub clear_policy: ClearPolicy,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            key_prefix: "policy_sync".to_string(),
            key_ttl_secs: 24 * 60 * 60,
            clear_policy: ClearPolicy::PendingOnly,
        }
    }
}

impl TrackerConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| TrackerError::Config(format!("{}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| TrackerError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that would produce unusable keys.
    pub fn validate(&self) -> Result<()> {
        if self.key_prefix.trim().is_empty() {
            return Err(TrackerError::Config("key_prefix must not be empty".to_string()));
        }
        Ok(())
    }

    /// Expiry applied to the active flag and worker counters.
    pub fn key_ttl(&self) -> Option<Duration> {
        (self.key_ttl_secs > 0).then(|| Duration::from_secs(self.key_ttl_secs))
    }
}
