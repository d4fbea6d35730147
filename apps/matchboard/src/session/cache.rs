//! Session state cache: TTL-aware per-view UI state with debounced persistence.
//!
//! Reads are served from an in-memory shadow, so a read always observes the most
//! recent write even while its durable copy is still waiting out the debounce
//! window. Durable writes lag behind and are coalesced per key.
//!
//! Lifecycle: one cache per session. `purge_all` is the logout hook; it cancels
//! every pending write before returning, so nothing lands after it.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::errors::EngineError;
use crate::session::store::BackingStore;
use crate::session::view_state::{Staleness, StalenessPolicy};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);
pub const DEFAULT_NAMESPACE: &str = "matchboard";

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Prefix for durable keys, `<namespace>:<key>`.
    pub namespace: String,
    pub debounce: Duration,
    /// LRU bound on entries; `None` is unbounded.
    pub capacity: Option<NonZeroUsize>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            debounce: DEFAULT_DEBOUNCE,
            capacity: None,
        }
    }
}

/// Durable record. Overwritten, never appended, on each persisted write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T> {
    pub key: String,
    pub payload: T,
    pub written_at: DateTime<Utc>,
}

/// Result of a read: the payload and how old it is. Stale values are still returned.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedValue<T> {
    pub payload: T,
    pub age_millis: u64,
    pub written_at: DateTime<Utc>,
}

impl<T> CachedValue<T> {
    pub fn age(&self) -> Duration {
        Duration::from_millis(self.age_millis)
    }

    pub fn staleness(&self, policy: &StalenessPolicy) -> Staleness {
        policy.classify(self.age())
    }
}

struct ShadowEntry<T> {
    entry: CacheEntry<T>,
    written: Instant,
}

impl<T: Clone> ShadowEntry<T> {
    fn to_cached(&self) -> CachedValue<T> {
        CachedValue {
            payload: self.entry.payload.clone(),
            age_millis: self.written.elapsed().as_millis() as u64,
            written_at: self.entry.written_at,
        }
    }
}

struct PendingWrite {
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

impl PendingWrite {
    fn cancel(self) {
        if let Some(handle) = self.handle {
            handle.abort();
        }
    }
}

struct CacheState<T> {
    shadow: LruCache<String, ShadowEntry<T>>,
    pending: HashMap<String, PendingWrite>,
    next_generation: u64,
}

struct CacheInner<T> {
    state: Mutex<CacheState<T>>,
    store: Arc<dyn BackingStore>,
    config: CacheConfig,
}

/// Generic session state cache. Cheap to clone; clones share state.
pub struct SessionStateCache<T> {
    inner: Arc<CacheInner<T>>,
}

impl<T> Clone for SessionStateCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> SessionStateCache<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + 'static,
{
    pub fn new(store: Arc<dyn BackingStore>, config: CacheConfig) -> Self {
        let shadow = match config.capacity {
            Some(capacity) => LruCache::new(capacity),
            None => LruCache::unbounded(),
        };
        Self {
            inner: Arc::new(CacheInner {
                state: Mutex::new(CacheState {
                    shadow,
                    pending: HashMap::new(),
                    next_generation: 0,
                }),
                store,
                config,
            }),
        }
    }

    /// Records `payload` for `key`. Visible to `read` immediately; persisted once
    /// no further write for the key arrives within the debounce window.
    ///
    /// Outside a tokio runtime there is nothing to debounce on, so the write is
    /// persisted synchronously.
    pub fn write(&self, key: impl Into<String>, payload: T) {
        let key = key.into();
        let mut state = self.inner.state.lock();

        let shadow = ShadowEntry {
            entry: CacheEntry {
                key: key.clone(),
                payload,
                written_at: Utc::now(),
            },
            written: Instant::now(),
        };
        if let Some((evicted, _)) = state.shadow.push(key.clone(), shadow) {
            if evicted != key {
                self.inner.evict(&mut state, &evicted);
            }
        }

        if let Some(previous) = state.pending.remove(&key) {
            previous.cancel();
        }
        state.next_generation += 1;
        let generation = state.next_generation;

        match Handle::try_current() {
            Ok(runtime) => {
                let weak: Weak<CacheInner<T>> = Arc::downgrade(&self.inner);
                let debounce = self.inner.config.debounce;
                let task_key = key.clone();
                let handle = runtime.spawn(async move {
                    tokio::time::sleep(debounce).await;
                    if let Some(inner) = weak.upgrade() {
                        inner.persist_if_current(&task_key, generation);
                    }
                });
                state.pending.insert(
                    key,
                    PendingWrite {
                        generation,
                        handle: Some(handle),
                    },
                );
            }
            Err(_) => {
                if let Some(shadow) = state.shadow.peek(&key) {
                    if let Err(e) = self.inner.persist(&shadow.entry) {
                        warn!("Session cache write for '{key}' failed: {e}");
                    }
                }
            }
        }
    }

    /// Returns the latest payload for `key` with its age, falling back to the
    /// backing store when the shadow has never seen the key.
    pub fn read(&self, key: &str) -> Result<Option<CachedValue<T>>, EngineError> {
        let mut state = self.inner.state.lock();
        if let Some(shadow) = state.shadow.get(key) {
            return Ok(Some(shadow.to_cached()));
        }

        let Some(raw) = self.inner.store.get(&self.inner.durable_key(key))? else {
            return Ok(None);
        };
        let entry: CacheEntry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Ignoring unreadable session entry '{key}': {e}");
                return Ok(None);
            }
        };

        let age = (Utc::now() - entry.written_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        let now = Instant::now();
        let shadow = ShadowEntry {
            written: now.checked_sub(age).unwrap_or(now),
            entry,
        };
        let cached = shadow.to_cached();
        debug!("Restored session entry '{key}' from backing store");

        if let Some((evicted, _)) = state.shadow.push(key.to_string(), shadow) {
            if evicted != key {
                self.inner.evict(&mut state, &evicted);
            }
        }
        Ok(Some(cached))
    }

    /// Removes one key from the shadow and the backing store, cancelling any
    /// pending write for it.
    pub fn purge(&self, key: &str) -> Result<(), EngineError> {
        let mut state = self.inner.state.lock();
        state.shadow.pop(key);
        if let Some(pending) = state.pending.remove(key) {
            pending.cancel();
        }
        self.inner.store.remove(&self.inner.durable_key(key))?;
        debug!("Purged session entry '{key}'");
        Ok(())
    }

    /// Logout hook. Synchronous: when this returns no pending write remains and
    /// every durable key of this namespace is gone, including ones from earlier sessions.
    pub fn purge_all(&self) -> Result<(), EngineError> {
        let mut state = self.inner.state.lock();
        let cancelled = state.pending.len();
        for (_, pending) in state.pending.drain() {
            pending.cancel();
        }
        state.shadow.clear();

        let prefix = self.inner.durable_prefix();
        let mut removed = 0;
        for durable_key in self.inner.store.keys()? {
            if durable_key.starts_with(&prefix) {
                self.inner.store.remove(&durable_key)?;
                removed += 1;
            }
        }
        info!("Session cache purged: {removed} durable entries removed, {cancelled} pending writes cancelled");
        Ok(())
    }

    /// Persists every pending write now instead of waiting for its timer.
    pub fn flush(&self) -> Result<usize, EngineError> {
        let mut state = self.inner.state.lock();
        let pending: Vec<(String, PendingWrite)> = state.pending.drain().collect();
        let mut flushed = 0;
        for (key, write) in pending {
            write.cancel();
            if let Some(shadow) = state.shadow.peek(&key) {
                self.inner.persist(&shadow.entry)?;
                flushed += 1;
            }
        }
        Ok(flushed)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.state.lock().shadow.contains(key)
    }

    pub fn len(&self) -> usize {
        self.inner.state.lock().shadow.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pending_writes(&self) -> usize {
        self.inner.state.lock().pending.len()
    }
}

impl<T: Serialize> CacheInner<T> {
    fn durable_prefix(&self) -> String {
        format!("{}:", self.config.namespace)
    }

    fn durable_key(&self, key: &str) -> String {
        format!("{}:{key}", self.config.namespace)
    }

    fn persist(&self, entry: &CacheEntry<T>) -> Result<(), EngineError> {
        let json = serde_json::to_string(entry)?;
        self.store.set(&self.durable_key(&entry.key), &json)?;
        Ok(())
    }

    /// Called by the debounce timer. Only the newest write for a key persists;
    /// the lock is held through the store call so a purge cannot interleave.
    fn persist_if_current(&self, key: &str, generation: u64) {
        let mut state = self.state.lock();
        match state.pending.get(key) {
            Some(pending) if pending.generation == generation => {}
            _ => return,
        }
        state.pending.remove(key);

        if let Some(shadow) = state.shadow.peek(key) {
            match self.persist(&shadow.entry) {
                Ok(()) => debug!("Persisted session entry '{key}'"),
                Err(e) => warn!("Debounced session write for '{key}' failed: {e}"),
            }
        }
    }

    /// Capacity eviction: drop the pending write and the durable copy too.
    fn evict(&self, state: &mut CacheState<T>, key: &str) {
        if let Some(pending) = state.pending.remove(key) {
            pending.cancel();
        }
        if let Err(e) = self.store.remove(&self.durable_key(key)) {
            warn!("Failed to remove evicted session entry '{key}': {e}");
        }
        debug!("Evicted session entry '{key}'");
    }
}
