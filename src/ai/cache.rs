use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

const MAX_ENTRIES: usize = 256;

/// In-memory response cache with a fixed time-to-live.
///
/// Owned by whoever builds the AI client and passed along explicitly.
/// Expired entries are dropped on read and swept on every insert; past
/// `MAX_ENTRIES` the oldest response is evicted.
#[derive(Debug)]
pub struct ResponseCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CachedResponse>>,
}

#[derive(Debug, Clone)]
struct CachedResponse {
    stored_at: Instant,
    value: String,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn key(kind: &str, payload: &str) -> String {
        format!("{kind}:{payload}")
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(cached) if cached.stored_at.elapsed() < self.ttl => Some(cached.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: String, value: String) {
        let mut entries = self.lock();
        entries.retain(|_, cached| cached.stored_at.elapsed() < self.ttl);

        if entries.len() >= MAX_ENTRIES && !entries.contains_key(&key) {
            let oldest = entries
                .iter()
                .min_by_key(|(_, cached)| cached.stored_at)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
            }
        }

        entries.insert(
            key,
            CachedResponse {
                stored_at: Instant::now(),
                value,
            },
        );
    }

    pub fn invalidate(&self, key: &str) -> bool {
        self.lock().remove(key).is_some()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CachedResponse>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::{MAX_ENTRIES, ResponseCache};
    use std::time::Duration;

    #[test]
    fn returns_fresh_values() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        let key = ResponseCache::key("insight", "{\"tasks\":[]}");
        cache.insert(key.clone(), "cached".to_string());

        assert_eq!(cache.get(&key).as_deref(), Some("cached"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn expired_values_are_dropped_on_read() {
        let cache = ResponseCache::new(Duration::ZERO);
        cache.insert("insight:x".to_string(), "stale".to_string());

        assert_eq!(cache.get("insight:x"), None);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn expired_values_are_swept_on_insert() {
        let cache = ResponseCache::new(Duration::ZERO);
        for index in 0..1000 {
            cache.insert(format!("insight:{index}"), "stale".to_string());
        }

        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn size_is_capped() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        for index in 0..=MAX_ENTRIES {
            cache.insert(format!("insight:{index}"), index.to_string());
        }

        assert_eq!(cache.len(), MAX_ENTRIES);
        assert_eq!(cache.get(&format!("insight:{MAX_ENTRIES}")).as_deref(), Some("256"));
    }

    #[test]
    fn invalidate_and_clear() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        cache.insert("a".to_string(), "1".to_string());
        cache.insert("b".to_string(), "2".to_string());

        assert!(cache.invalidate("a"));
        assert!(!cache.invalidate("a"));
        cache.clear();
        assert_eq!(cache.len(), 0);
    }
}
