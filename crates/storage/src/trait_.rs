//! Key-value store trait abstraction.

use async_trait::async_trait;
use std::time::Duration;

/// Error type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Backend could not be reached or rejected the command
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Key holds a value of another kind
    #[error("key {key} does not hold a {expected}")]
    WrongType {
        /// Offending key
        key: String,
        /// Kind the command expected
        expected: &'static str,
    },

    /// Counter command against a non-integer value
    #[error("key {key} holds {value:?}, not an integer")]
    InvalidInteger {
        /// Offending key
        key: String,
        /// Stored value
        value: String,
    },

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Shared key-value store holding the bookkeeping of propagation runs.
///
/// Every method is a single atomic command. Many trackers in many processes
/// hit the same keys, so callers compose these primitives rather than
/// reading, modifying and writing back.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    // === Set operations ===

    /// Add a member to a set. Returns `true` if it was not already present.
    async fn set_add(&self, key: &str, member: &str) -> Result<bool>;

    /// Add several members to a set. Returns how many were new.
    async fn set_add_many(&self, key: &str, members: &[String]) -> Result<usize>;

    /// Remove a member from a set. Returns `true` if it was present.
    async fn set_remove(&self, key: &str, member: &str) -> Result<bool>;

    /// All members of a set (empty when the key is absent).
    async fn set_members(&self, key: &str) -> Result<Vec<String>>;

    /// Number of members in a set (zero when the key is absent).
    async fn set_cardinality(&self, key: &str) -> Result<usize>;

    // === Counter operations ===

    /// Add `by` to an integer counter, creating it at zero. Returns the new value.
    async fn incr_by(&self, key: &str, by: i64) -> Result<i64>;

    /// Subtract `by` from an existing counter unless the result would drop
    /// below `floor`. Returns the new value, or `None` when the counter is
    /// absent or already too low; in that case nothing is written.
    async fn decr_by_floored(&self, key: &str, by: i64, floor: i64) -> Result<Option<i64>>;

    // === Plain values ===

    /// Read a plain value.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a plain value, optionally expiring after `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()>;

    /// Write a plain value only if the key is absent. Returns `true` if written.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<bool>;

    /// Delete keys of any kind. Returns how many existed.
    async fn delete(&self, keys: &[String]) -> Result<usize>;
}
