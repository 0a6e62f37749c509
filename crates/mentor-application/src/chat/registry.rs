//! Bounded session registry.
//!
//! A fixed-capacity LRU map from conversation id to a live session. Its
//! whole reason to exist is to amortize reconstruction cost (replaying and
//! re-embedding persisted history) across requests; under concurrent first
//! access a per-id gate guarantees at most one reconstruction.

use std::collections::HashMap;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use tokio::sync::Mutex;
use tracing::debug;

use mentor_core::error::Result;

/// Fixed-capacity registry with single-flight construction.
pub struct SessionRegistry<T> {
    sessions: Mutex<LruCache<String, Arc<T>>>,
    /// Per-id construction gates for cold entries.
    inflight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<T> SessionRegistry<T> {
    /// Creates a registry bounded to `capacity` live entries.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            sessions: Mutex::new(LruCache::new(capacity)),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached entry for `id`, building it if absent.
    ///
    /// Repeated calls return the same `Arc`. Concurrent calls for the same
    /// cold id run the builder exactly once: losers of the per-id gate
    /// re-check the cache after the winner inserts.
    ///
    /// # Errors
    ///
    /// Propagates the builder's error; a failed build leaves the id cold so
    /// a later call can try again.
    pub async fn get_or_create<F, Fut>(&self, id: &str, build: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(session) = self.sessions.lock().await.get(id) {
            return Ok(session.clone());
        }

        let gate = {
            let mut inflight = self.inflight.lock().await;
            inflight
                .entry(id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let _build_guard = gate.lock().await;

        // Double-check: the gate's previous holder may have built it.
        if let Some(session) = self.sessions.lock().await.get(id) {
            return Ok(session.clone());
        }

        let result = build().await;
        let session = match result {
            Ok(session) => Arc::new(session),
            Err(err) => {
                self.inflight.lock().await.remove(id);
                return Err(err);
            }
        };

        let evicted = self
            .sessions
            .lock()
            .await
            .push(id.to_string(), session.clone());
        if let Some((evicted_id, _)) = evicted {
            debug!(%evicted_id, "registry over capacity, evicted session");
        }
        self.inflight.lock().await.remove(id);

        Ok(session)
    }

    /// Returns the cached entry without building, refreshing its recency.
    pub async fn get(&self, id: &str) -> Option<Arc<T>> {
        self.sessions.lock().await.get(id).cloned()
    }

    /// Removes and discards an entry. No flush is needed — persistence
    /// happens incrementally while the session is live.
    pub async fn evict(&self, id: &str) -> bool {
        self.sessions.lock().await.pop(id).is_some()
    }

    /// Whether an entry is currently cached.
    pub async fn contains(&self, id: &str) -> bool {
        self.sessions.lock().await.contains(id)
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Whether the registry holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}
