//! In-memory cache with per-entry expiration.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::trace;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Thread-safe map whose entries expire after their time-to-live.
///
/// Callers never lock: every operation takes the internal lock for its own duration.
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    default_ttl: Duration,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            default_ttl,
        }
    }

    /// Returns the cached value, expired entries count as misses and are evicted.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.lock();

        match entries.get(key) {
            Some(entry) if !entry.is_expired() => Some(entry.value.clone()),
            Some(_) => {
                trace!("Evicting expired entry: {}", key);
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.lock().insert(key.into(), entry);
    }

    /// Stores a value with the cache default expiration.
    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.set(key, value, self.default_ttl);
    }

    pub fn len(&self) -> usize {
        self.lock().values().filter(|entry| !entry.is_expired()).count()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<V>>> {
        // a panic while holding the lock can't leave a half-written entry
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn get_returns_stored_value() {
        let cache = TtlCache::new(Duration::from_secs(3600));
        cache.insert("10.0.0.1:22", true);
        cache.insert("10.0.0.1:23", false);

        assert_eq!(cache.get("10.0.0.1:22"), Some(true));
        assert_eq!(cache.get("10.0.0.1:23"), Some(false));
        assert_eq!(cache.get("10.0.0.1:80"), None);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn expired_entries_are_misses() {
        let cache = TtlCache::new(Duration::from_secs(3600));
        cache.set("10.0.0.1:22", true, Duration::ZERO);

        assert_eq!(cache.get("10.0.0.1:22"), None);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn concurrent_inserts_are_visible() {
        let cache = Arc::new(TtlCache::new(Duration::from_secs(60)));

        let handles: Vec<_> = (0..8u16)
            .map(|port| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.insert(format!("127.0.0.1:{port}"), port % 2 == 0))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.len(), 8);
        assert_eq!(cache.get("127.0.0.1:4"), Some(true));
        assert_eq!(cache.get("127.0.0.1:5"), Some(false));
    }
}
