//! TTL cache shared across client reads
//!
//! A key-value store with one fixed time-to-live for every entry and
//! substring-based invalidation. The remote API has no change
//! notifications, so write paths invalidate the affected keys instead of
//! updating them (write-through invalidation, not a write-through cache).
//!
//! Lookup and compute-on-miss form a single critical section per key: two
//! concurrent callers missing on the same key issue one network call, and
//! a half-written entry is never observable.

use machina_core::MachinaResult;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::Mutex as AsyncMutex;

struct Entry<T> {
    value: T,
    stored_at: Instant,
}

/// An in-process TTL cache.
///
/// An expired entry is indistinguishable from an absent one: both paths
/// invoke the compute closure and refresh the entry transparently.
pub struct TtlCache<T> {
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry<T>>>,
    /// Per-key gates serializing compute-on-miss.
    gates: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached value for `key`, or run `compute`, store its
    /// result, and return it.
    ///
    /// A failed compute stores nothing: the next caller retries it.
    pub async fn get_or_compute<F, Fut>(&self, key: &str, compute: F) -> MachinaResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = MachinaResult<T>>,
    {
        if let Some(value) = self.lookup(key) {
            return Ok(value);
        }

        let gate = self.gate(key);
        let _guard = gate.lock().await;

        // Another caller may have filled the entry while we waited.
        if let Some(value) = self.lookup(key) {
            return Ok(value);
        }

        let value = compute().await?;
        self.store(key, value.clone());
        Ok(value)
    }

    /// Remove every entry whose key contains `pattern`. Returns the
    /// number of entries removed.
    pub fn invalidate(&self, pattern: &str) -> usize {
        let mut entries = self.lock_entries();
        let before = entries.len();
        entries.retain(|key, _| !key.contains(pattern));
        before - entries.len()
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.lock_entries().clear();
    }

    fn lookup(&self, key: &str) -> Option<T> {
        let entries = self.lock_entries();
        let entry = entries.get(key)?;
        if entry.stored_at.elapsed() < self.ttl {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    fn store(&self, key: &str, value: T) {
        self.lock_entries().insert(
            key.to_string(),
            Entry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    fn gate(&self, key: &str) -> Arc<AsyncMutex<()>> {
        let mut gates = self
            .gates
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        gates
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    fn lock_entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry<T>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.lock_entries().len()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counting_cache(ttl_ms: u64) -> (Arc<TtlCache<String>>, Arc<AtomicU32>) {
        (
            Arc::new(TtlCache::new(Duration::from_millis(ttl_ms))),
            Arc::new(AtomicU32::new(0)),
        )
    }

    async fn fetch(calls: &AtomicU32) -> MachinaResult<String> {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok("value".to_string())
    }

    #[tokio::test]
    async fn test_second_read_within_ttl_skips_compute() {
        let (cache, calls) = counting_cache(60_000);

        let a = cache.get_or_compute("k", || fetch(&calls)).await.unwrap();
        let b = cache.get_or_compute("k", || fetch(&calls)).await.unwrap();

        assert_eq!(a, "value");
        assert_eq!(b, "value");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_refetched() {
        let (cache, calls) = counting_cache(5);

        cache.get_or_compute("k", || fetch(&calls)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        cache.get_or_compute("k", || fetch(&calls)).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_compute_is_not_cached() {
        let (cache, calls) = counting_cache(60_000);

        let failed: MachinaResult<String> = cache
            .get_or_compute("k", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(machina_core::RemoteError::Network {
                    message: "reset".to_string(),
                }
                .into())
            })
            .await;
        assert!(failed.is_err());

        cache.get_or_compute("k", || fetch(&calls)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_misses_coalesce_into_one_compute() {
        let (cache, calls) = counting_cache(60_000);

        let slow_fetch = |cache: Arc<TtlCache<String>>, calls: Arc<AtomicU32>| async move {
            cache
                .get_or_compute("k", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok("value".to_string())
                })
                .await
        };

        let (a, b) = tokio::join!(
            slow_fetch(Arc::clone(&cache), Arc::clone(&calls)),
            slow_fetch(Arc::clone(&cache), Arc::clone(&calls)),
        );

        assert_eq!(a.unwrap(), "value");
        assert_eq!(b.unwrap(), "value");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_by_substring() {
        let (cache, calls) = counting_cache(60_000);

        cache.get_or_compute("records:list:all", || fetch(&calls)).await.unwrap();
        cache.get_or_compute("records:list:featured", || fetch(&calls)).await.unwrap();
        cache.get_or_compute("records:get:rec1", || fetch(&calls)).await.unwrap();

        let removed = cache.invalidate("records:list");
        assert_eq!(removed, 2);
        assert_eq!(cache.len(), 1);

        // The surviving record key is still served from cache.
        cache.get_or_compute("records:get:rec1", || fetch(&calls)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_clear_removes_everything() {
        let (cache, calls) = counting_cache(60_000);
        cache.get_or_compute("a", || fetch(&calls)).await.unwrap();
        cache.get_or_compute("b", || fetch(&calls)).await.unwrap();

        cache.clear();
        assert_eq!(cache.len(), 0);
    }
}
