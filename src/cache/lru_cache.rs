use lru::LruCache;
use parking_lot::Mutex;
use std::{borrow::Borrow, hash::Hash, num::NonZeroUsize, sync::Arc};
use tracing::debug;

struct Inner<K, V> {
    cache: LruCache<K, V>,
    metrics: CacheMetrics,
}

/// Cache LRU de capacidad fija.
///
/// Every `get` and `put` runs under one lock, so promoting an entry and
/// evicting the oldest one can never interleave between callers.
pub struct LRUCache<K: Clone + Eq + Hash, V> {
    inner: Arc<Mutex<Inner<K, V>>>,
}

impl<K, V> LRUCache<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates a cache holding at most `capacity` entries. A capacity of 0
    /// is treated as 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Arc::new(Mutex::new(Inner {
                cache: LruCache::new(capacity),
                metrics: CacheMetrics::default(),
            })),
        }
    }

    /// Returns a clone of the cached value and marks the key as most recently
    /// used. The stored value itself is never modified.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        let value = inner.cache.get(key).cloned();
        if value.is_some() {
            inner.metrics.hits += 1;
        } else {
            inner.metrics.misses += 1;
        }
        value
    }

    /// Inserts or overwrites `key`, marks it most recently used and evicts
    /// least recently used keys until the capacity holds again.
    ///
    /// Returns the keys that were evicted.
    pub fn put(&self, key: K, value: V) -> Vec<K> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        let mut evicted = Vec::new();
        // push hands back the old pair on overwrite, the LRU pair when full
        if let Some((old_key, _)) = inner.cache.push(key.clone(), value) {
            if old_key != key {
                evicted.push(old_key);
            }
        }
        while inner.cache.len() > inner.cache.cap().get() {
            match inner.cache.pop_lru() {
                Some((old_key, _)) => evicted.push(old_key),
                None => break,
            }
        }

        inner.metrics.evictions += evicted.len() as u64;
        if !evicted.is_empty() {
            debug!("Cache lleno: {} entradas desalojadas", evicted.len());
        }
        evicted
    }

    /// Checks presence without touching the recency order.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.lock().cache.contains(key)
    }

    /// Keys from least to most recently used.
    pub fn keys_by_recency(&self) -> Vec<K> {
        self.inner
            .lock()
            .cache
            .iter()
            .rev()
            .map(|(key, _)| key.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().cache.cap().get()
    }

    pub fn metrics(&self) -> CacheMetrics {
        self.inner.lock().metrics.clone()
    }
}

impl<K, V> Clone for LRUCache<K, V>
where
    K: Clone + Eq + Hash,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Métricas básicas del cache
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl CacheMetrics {
    pub fn hit_rate(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            self.hits as f64 / (self.hits + self.misses) as f64
        }
    }

    pub fn miss_rate(&self) -> f64 {
        1.0 - self.hit_rate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn filled(capacity: usize, n: usize) -> LRUCache<String, usize> {
        let cache = LRUCache::new(capacity);
        for i in 0..n {
            cache.put(format!("q{i}"), i);
        }
        cache
    }

    #[test]
    fn never_exceeds_capacity() {
        let cache = LRUCache::new(3);
        for i in 0..50 {
            cache.put(i % 7, i);
            assert!(cache.len() <= 3);
        }
    }

    #[test]
    fn evicts_least_recently_used() {
        let cache = filled(15, 15);
        assert_eq!(cache.len(), 15);

        let evicted = cache.put("new query".to_string(), 99);

        assert_eq!(evicted, vec!["q0".to_string()]);
        assert_eq!(cache.len(), 15);
        assert!(!cache.contains_key("q0"));
        assert_eq!(cache.keys_by_recency().last(), Some(&"new query".to_string()));
    }

    #[test]
    fn get_promotes_entry() {
        let cache = filled(3, 3);

        assert_eq!(cache.get("q0"), Some(0));
        let evicted = cache.put("q3".to_string(), 3);

        assert_eq!(evicted, vec!["q1".to_string()]);
        assert!(cache.contains_key("q0"));
        assert_eq!(
            cache.keys_by_recency(),
            vec!["q2".to_string(), "q0".to_string(), "q3".to_string()]
        );
    }

    #[test]
    fn get_only_changes_recency() {
        let cache = filled(4, 4);
        let before: Vec<_> = (0..4).map(|i| cache.get(format!("q{i}").as_str())).collect();
        let after: Vec<_> = (0..4).map(|i| cache.get(format!("q{i}").as_str())).collect();

        assert_eq!(before, after);
        assert_eq!(cache.len(), 4);
    }

    #[test]
    fn overwrite_keeps_single_entry() {
        let cache = filled(2, 2);

        let evicted = cache.put("q0".to_string(), 10);

        assert!(evicted.is_empty());
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("q0"), Some(10));
        assert_eq!(cache.keys_by_recency(), vec!["q1".to_string(), "q0".to_string()]);
    }

    #[test]
    fn contains_key_does_not_promote() {
        let cache = filled(2, 2);

        assert!(cache.contains_key("q0"));
        cache.put("q2".to_string(), 2);

        assert!(!cache.contains_key("q0"));
    }

    #[test]
    fn metrics_track_hits_misses_evictions() {
        let cache = filled(1, 2);
        cache.get("q1");
        cache.get("missing");

        let metrics = cache.metrics();
        assert_eq!(
            metrics,
            CacheMetrics {
                hits: 1,
                misses: 1,
                evictions: 1
            }
        );
        assert!((metrics.hit_rate() - 0.5).abs() < f64::EPSILON);
        assert!((metrics.miss_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_capacity_holds_one_entry() {
        let cache = LRUCache::new(0);
        assert_eq!(cache.capacity(), 1);

        cache.put("a", 1);
        let evicted = cache.put("b", 2);

        assert_eq!(evicted, vec!["a"]);
        assert_eq!(cache.keys_by_recency(), vec!["b"]);
    }

    #[test]
    fn concurrent_access_keeps_bound() {
        let cache = LRUCache::new(15);
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for i in 0..200 {
                        let key = format!("t{t}-{}", i % 20);
                        cache.put(key.clone(), i);
                        cache.get(&key);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.len(), 15);
        assert_eq!(cache.keys_by_recency().len(), 15);
    }
}
