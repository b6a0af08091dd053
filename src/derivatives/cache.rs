use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

struct CacheItem<V> {
    value: V,
    expires_at: Instant,
}

/// In-memory TTL cache guarding duplicate HTTP fetches within a tick.
/// Process-local, no persistence: a restart reseeds from empty.
pub struct TtlCache<V: Clone> {
    store: Mutex<HashMap<String, CacheItem<V>>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new() -> Self {
        Self {
            store: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        let mut store = self.store.lock().await;
        match store.get(key) {
            Some(item) if Instant::now() < item.expires_at => Some(item.value.clone()),
            Some(_) => {
                store.remove(key);
                None
            }
            None => None,
        }
    }

    pub async fn set(&self, key: String, value: V, ttl: Duration) {
        let mut store = self.store.lock().await;
        store.insert(
            key,
            CacheItem {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    pub async fn clear(&self) {
        self.store.lock().await.clear();
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_none_after_expiry() {
        let cache: TtlCache<i32> = TtlCache::new();
        cache.set("k".to_string(), 5, Duration::from_millis(10)).await;
        assert_eq!(cache.get("k").await, Some(5));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn missing_key_is_none() {
        let cache: TtlCache<i32> = TtlCache::new();
        assert_eq!(cache.get("missing").await, None);
    }
}
