// src/services/cache.rs
//
// Keyed TTL memoization for the fetch/derive calls. Entries are valid
// until `now - created > ttl`; an expired entry is recomputed on the
// calling task, never served stale. The lock is not held across the
// compute await, so concurrent misses on the same key may recompute
// twice — fetches are idempotent, so that is acceptable.
use log::debug;
use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Macro series refresh daily.
pub const MACRO_TTL: Duration = Duration::from_secs(86_400);

/// Prices, valuations and search refresh hourly.
pub const MARKET_TTL: Duration = Duration::from_secs(3_600);

struct Entry<V> {
    value: V,
    created: Instant,
}

pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: Mutex<HashMap<K, Entry<V>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        TtlCache {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Fresh hit or `None`. Expired entries are evicted on the way out.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock().ok()?;
        match entries.get(key) {
            Some(entry) if entry.created.elapsed() <= self.ttl => Some(entry.value.clone()),
            Some(_) => {
                debug!("Cache entry for {:?} expired", key);
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: K, value: V) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(
                key,
                Entry {
                    value,
                    created: Instant::now(),
                },
            );
        }
    }

    /// Return the memoized value, or run `compute` and store its result.
    pub async fn get_or_compute<F, Fut>(&self, key: K, compute: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        if let Some(value) = self.get(&key) {
            debug!("Cache hit for {:?}", key);
            return value;
        }
        let value = compute().await;
        self.insert(key, value.clone());
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn second_call_within_ttl_does_not_recompute() {
        let cache: TtlCache<String, u64> = TtlCache::new(Duration::from_secs(60));
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let value = cache
                .get_or_compute("macro:DFF".to_string(), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    42
                })
                .await;
            assert_eq!(value, 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_entry_is_recomputed() {
        let cache: TtlCache<String, u64> = TtlCache::new(Duration::from_millis(10));
        let calls = AtomicUsize::new(0);

        let fetch = || async {
            calls.fetch_add(1, Ordering::SeqCst) as u64
        };
        cache.get_or_compute("key".to_string(), fetch).await;
        std::thread::sleep(Duration::from_millis(25));
        cache.get_or_compute("key".to_string(), fetch).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn distinct_keys_are_independent() {
        let cache: TtlCache<Vec<String>, usize> = TtlCache::new(Duration::from_secs(60));
        let a = cache
            .get_or_compute(vec!["NVDA".to_string()], || async { 1 })
            .await;
        let b = cache
            .get_or_compute(vec!["NVDA".to_string(), "MSFT".to_string()], || async { 2 })
            .await;
        assert_eq!((a, b), (1, 2));
    }

    #[test]
    fn expired_get_evicts_and_returns_none() {
        let cache: TtlCache<&'static str, u8> = TtlCache::new(Duration::from_millis(0));
        cache.insert("k", 7);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get(&"k"), None);
        assert_eq!(cache.get(&"k"), None);
    }
}
