//! In-memory store implementation.
//!
//! Keeps every key in one map behind a tokio mutex, so each command is atomic
//! with respect to the others, matching what a Redis-like backend gives the
//! tracker. Expired keys are dropped lazily when touched.

use super::{KeyValueStore, Result, StoreError};
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug, Clone)]
enum Value {
    Scalar(String),
    Set(BTreeSet<String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Process-local key-value store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Live keys, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let mut entries = self.entries.lock().await;
        purge_expired(&mut entries);
        let mut keys: Vec<String> = entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of live keys.
    pub async fn len(&self) -> usize {
        self.keys().await.len()
    }

    /// Whether the store holds no live keys.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn purge_expired(entries: &mut HashMap<String, Entry>) {
    let now = Instant::now();
    entries.retain(|_, entry| !entry.is_expired(now));
}

/// Look up a live entry, dropping it first if its TTL has passed.
fn live<'a>(entries: &'a mut HashMap<String, Entry>, key: &str) -> Option<&'a mut Entry> {
    if entries.get(key).is_some_and(|e| e.is_expired(Instant::now())) {
        tracing::trace!(key, "dropping expired key");
        entries.remove(key);
    }
    entries.get_mut(key)
}

fn set_mut<'a>(
    entries: &'a mut HashMap<String, Entry>,
    key: &str,
) -> Result<&'a mut BTreeSet<String>> {
    if live(entries, key).is_none() {
        entries.insert(
            key.to_string(),
            Entry {
                value: Value::Set(BTreeSet::new()),
                expires_at: None,
            },
        );
    }
    match entries.get_mut(key).map(|e| &mut e.value) {
        Some(Value::Set(set)) => Ok(set),
        _ => Err(wrong_type(key, "set")),
    }
}

fn parse_counter(key: &str, raw: &str) -> Result<i64> {
    raw.parse().map_err(|_| StoreError::InvalidInteger {
        key: key.to_string(),
        value: raw.to_string(),
    })
}

fn wrong_type(key: &str, expected: &'static str) -> StoreError {
    StoreError::WrongType {
        key: key.to_string(),
        expected,
    }
}

#[async_trait::async_trait]
impl KeyValueStore for MemoryStore {
    async fn set_add(&self, key: &str, member: &str) -> Result<bool> {
        let mut entries = self.entries.lock().await;
        Ok(set_mut(&mut entries, key)?.insert(member.to_string()))
    }

    async fn set_add_many(&self, key: &str, members: &[String]) -> Result<usize> {
        if members.is_empty() {
            return Ok(0);
        }
        let mut entries = self.entries.lock().await;
        let set = set_mut(&mut entries, key)?;
        Ok(members
            .iter()
            .filter(|member| set.insert((*member).clone()))
            .count())
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<bool> {
        let mut entries = self.entries.lock().await;
        let Some(entry) = live(&mut entries, key) else {
            return Ok(false);
        };
        let Value::Set(set) = &mut entry.value else {
            return Err(wrong_type(key, "set"));
        };
        let removed = set.remove(member);
        let now_empty = set.is_empty();
        // Empty sets do not exist as keys.
        if now_empty {
            entries.remove(key);
        }
        Ok(removed)
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>> {
        let mut entries = self.entries.lock().await;
        match live(&mut entries, key).map(|e| &e.value) {
            None => Ok(Vec::new()),
            Some(Value::Set(set)) => Ok(set.iter().cloned().collect()),
            Some(Value::Scalar(_)) => Err(wrong_type(key, "set")),
        }
    }

    async fn set_cardinality(&self, key: &str) -> Result<usize> {
        let mut entries = self.entries.lock().await;
        match live(&mut entries, key).map(|e| &e.value) {
            None => Ok(0),
            Some(Value::Set(set)) => Ok(set.len()),
            Some(Value::Scalar(_)) => Err(wrong_type(key, "set")),
        }
    }

    async fn incr_by(&self, key: &str, by: i64) -> Result<i64> {
        let mut entries = self.entries.lock().await;
        let Some(entry) = live(&mut entries, key) else {
            entries.insert(
                key.to_string(),
                Entry {
                    value: Value::Scalar(by.to_string()),
                    expires_at: None,
                },
            );
            return Ok(by);
        };
        let Value::Scalar(raw) = &mut entry.value else {
            return Err(wrong_type(key, "counter"));
        };
        let current = parse_counter(key, raw)?;
        let next = current
            .checked_add(by)
            .ok_or_else(|| StoreError::Other(format!("counter {} overflowed", key)))?;
        *raw = next.to_string();
        Ok(next)
    }

    async fn decr_by_floored(&self, key: &str, by: i64, floor: i64) -> Result<Option<i64>> {
        let mut entries = self.entries.lock().await;
        let Some(entry) = live(&mut entries, key) else {
            return Ok(None);
        };
        let Value::Scalar(raw) = &mut entry.value else {
            return Err(wrong_type(key, "counter"));
        };
        let current = parse_counter(key, raw)?;
        match current.checked_sub(by) {
            Some(next) if next >= floor => {
                *raw = next.to_string();
                Ok(Some(next))
            }
            _ => Ok(None),
        }
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries.lock().await;
        match live(&mut entries, key).map(|e| &e.value) {
            None => Ok(None),
            Some(Value::Scalar(raw)) => Ok(Some(raw.clone())),
            Some(Value::Set(_)) => Err(wrong_type(key, "plain value")),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let mut entries = self.entries.lock().await;
        entries.insert(
            key.to_string(),
            Entry {
                value: Value::Scalar(value.to_string()),
                expires_at: ttl.map(|ttl| Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<bool> {
        let mut entries = self.entries.lock().await;
        if live(&mut entries, key).is_some() {
            return Ok(false);
        }
        entries.insert(
            key.to_string(),
            Entry {
                value: Value::Scalar(value.to_string()),
                expires_at: ttl.map(|ttl| Instant::now() + ttl),
            },
        );
        Ok(true)
    }

    async fn delete(&self, keys: &[String]) -> Result<usize> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        Ok(keys
            .iter()
            .filter_map(|key| entries.remove(key))
            .filter(|entry| !entry.is_expired(now))
            .count())
    }
}
