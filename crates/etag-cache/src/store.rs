//! Tag-aware byte store collaborator.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::error::{StoreError, StoreResult};

/// Byte-oriented store holding cache entries.
///
/// Durability, size-based eviction and replication belong to the
/// implementation.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get the bytes stored under a key.
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Store bytes under a key with tags and a time-to-live.
    async fn set(&self, key: &str, value: Vec<u8>, tags: &[String], ttl: Duration) -> StoreResult<()>;

    /// Evict every entry carrying a tag.
    async fn evict_by_tag(&self, tag: &str) -> StoreResult<()>;
}

struct StoredValue {
    bytes: Vec<u8>,
    tags: Vec<String>,
    /// `None` when the TTL does not fit in an `Instant`: the entry never expires.
    expires_at: Option<Instant>,
}

impl StoredValue {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

#[derive(Default)]
struct MemoryState {
    entries: HashMap<String, StoredValue>,
    tag_index: HashMap<String, HashSet<String>>,
}

impl MemoryState {
    fn remove(&mut self, key: &str) {
        if let Some(value) = self.entries.remove(key) {
            for tag in &value.tags {
                if let Some(keys) = self.tag_index.get_mut(tag) {
                    keys.remove(key);
                    if keys.is_empty() {
                        self.tag_index.remove(tag);
                    }
                }
            }
        }
    }

    fn purge_expired(&mut self, now: Instant) {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, value)| value.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in expired {
            self.remove(&key);
        }
    }
}

/// In-process store with per-entry TTL and a tag index.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    /// Create a new in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.state
            .read()
            .map(|state| state.entries.values().filter(|v| !v.is_expired(now)).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check whether a live entry exists for a key.
    pub fn contains_key(&self, key: &str) -> bool {
        let now = Instant::now();
        self.state
            .read()
            .map(|state| state.entries.get(key).is_some_and(|v| !v.is_expired(now)))
            .unwrap_or(false)
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let now = Instant::now();
        {
            let state = self.state.read().map_err(|_| StoreError::Poisoned)?;
            match state.entries.get(key) {
                Some(value) if !value.is_expired(now) => return Ok(Some(value.bytes.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // Expired: drop it so the tag index does not grow.
        let mut state = self.state.write().map_err(|_| StoreError::Poisoned)?;
        if state.entries.get(key).is_some_and(|v| v.is_expired(now)) {
            state.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: Vec<u8>, tags: &[String], ttl: Duration) -> StoreResult<()> {
        let now = Instant::now();
        let mut state = self.state.write().map_err(|_| StoreError::Poisoned)?;
        state.purge_expired(now);
        state.remove(key);

        for tag in tags {
            state
                .tag_index
                .entry(tag.clone())
                .or_default()
                .insert(key.to_string());
        }
        state.entries.insert(
            key.to_string(),
            StoredValue {
                bytes: value,
                tags: tags.to_vec(),
                expires_at: now.checked_add(ttl),
            },
        );

        Ok(())
    }

    async fn evict_by_tag(&self, tag: &str) -> StoreResult<()> {
        let mut state = self.state.write().map_err(|_| StoreError::Poisoned)?;
        let keys = state.tag_index.remove(tag).unwrap_or_default();
        for key in keys {
            state.remove(&key);
        }
        Ok(())
    }
}
