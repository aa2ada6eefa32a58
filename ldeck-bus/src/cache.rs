/// Cache client for derived read data, invalidated on writes.
///
/// Owns nothing but the key scheme. Every failure, and the absent-store
/// case, degrades to a no-op: a cache problem must never surface to the
/// caller as an error.

use crate::kv::KvStore;
use ldeck_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Cache key for a list's rendered detail view.
pub fn detail_key(list_id: &str) -> String {
    format!("list:{}:detail", list_id)
}

/// Cache key for a list's derived statistics.
pub fn stats_key(list_id: &str) -> String {
    format!("list:{}:stats", list_id)
}

/// Cache key for slug-to-id resolution.
pub fn slug_key(slug: &str) -> String {
    format!("slug:{}:resolve", slug)
}

pub struct CacheClient {
    store: Option<Arc<dyn KvStore>>,
}

impl CacheClient {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store: Some(store) }
    }

    /// A client without a backing store; gets miss, writes are no-ops.
    pub fn disabled() -> Self {
        Self { store: None }
    }

    /// Read a cached JSON value. Any failure reads as a miss.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let store = self.store.as_ref()?;
        match Self::get_inner(store.as_ref(), key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "cache read failed, treating as miss");
                None
            }
        }
    }

    fn get_inner<T: DeserializeOwned>(store: &dyn KvStore, key: &str) -> Result<Option<T>> {
        let raw = store
            .get(key)
            .map_err(|e| Error::CacheFailure(format!("read {}: {}", key, e)))?;
        match raw {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| Error::CacheFailure(format!("decode {}: {}", key, e))),
            None => Ok(None),
        }
    }

    /// Write a JSON value with a TTL. Failures are swallowed.
    pub fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let Some(store) = &self.store else { return };
        if let Err(e) = Self::set_inner(store.as_ref(), key, value, ttl) {
            warn!(key, error = %e, "cache write failed, continuing");
        }
    }

    fn set_inner<T: Serialize>(
        store: &dyn KvStore,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<()> {
        let raw = serde_json::to_string(value)
            .map_err(|e| Error::CacheFailure(format!("encode {}: {}", key, e)))?;
        store
            .set_with_expiry(key, &raw, ttl)
            .map_err(|e| Error::CacheFailure(format!("write {}: {}", key, e)))
    }

    /// Drop a single key. Failures are swallowed.
    pub fn delete(&self, key: &str) {
        let Some(store) = &self.store else { return };
        if let Err(e) = store
            .delete(key)
            .map_err(|e| Error::CacheFailure(format!("delete {}: {}", key, e)))
        {
            warn!(key, error = %e, "cache delete failed, continuing");
        }
    }

    /// Drop every derived key for a list after a mutation.
    pub fn invalidate_list(&self, list_id: &str, slug: &str) {
        self.delete(&detail_key(list_id));
        self.delete(&stats_key(list_id));
        self.delete(&slug_key(slug));
        debug!(list_id, "invalidated derived cache entries");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryKvStore;
    use serde_json::json;

    #[test]
    fn test_set_then_get_json() {
        let store = Arc::new(MemoryKvStore::new());
        let cache = CacheClient::new(store);

        let key = stats_key("list-1");
        cache.set_json(&key, &json!({"clicks": 10}), Duration::from_secs(60));

        let value: Option<serde_json::Value> = cache.get_json(&key);
        assert_eq!(value.unwrap()["clicks"], 10);
    }

    #[test]
    fn test_invalidate_list_drops_all_keys() {
        let store = Arc::new(MemoryKvStore::new());
        let cache = CacheClient::new(store.clone());

        cache.set_json(&detail_key("list-1"), &json!({"a": 1}), Duration::from_secs(60));
        cache.set_json(&stats_key("list-1"), &json!({"b": 2}), Duration::from_secs(60));
        cache.set_json(&slug_key("reading"), &json!("list-1"), Duration::from_secs(60));
        assert_eq!(store.len(), 3);

        cache.invalidate_list("list-1", "reading");
        assert!(store.is_empty());
    }

    #[test]
    fn test_disabled_cache_always_misses() {
        let cache = CacheClient::disabled();
        cache.set_json("k", &json!(1), Duration::from_secs(60));
        let value: Option<serde_json::Value> = cache.get_json("k");
        assert!(value.is_none());
        // Invalidation on a disabled client is a harmless no-op
        cache.invalidate_list("list-1", "reading");
    }

    struct DownStore;

    impl KvStore for DownStore {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(Error::Internal("kv down".into()))
        }
        fn set_with_expiry(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<()> {
            Err(Error::Internal("kv down".into()))
        }
        fn delete(&self, _key: &str) -> Result<()> {
            Err(Error::Internal("kv down".into()))
        }
        fn list_push(&self, _key: &str, _value: &str) -> Result<usize> {
            Err(Error::Internal("kv down".into()))
        }
        fn list_trim(&self, _key: &str, _start: i64, _stop: i64) -> Result<()> {
            Err(Error::Internal("kv down".into()))
        }
        fn list_range(&self, _key: &str, _start: i64, _stop: i64) -> Result<Vec<String>> {
            Err(Error::Internal("kv down".into()))
        }
        fn expire(&self, _key: &str, _ttl: Duration) -> Result<()> {
            Err(Error::Internal("kv down".into()))
        }
    }

    #[test]
    fn test_failing_store_degrades_to_miss_and_noop() {
        let cache = CacheClient::new(Arc::new(DownStore));
        cache.set_json("k", &json!({"a": 1}), Duration::from_secs(60));
        let value: Option<serde_json::Value> = cache.get_json("k");
        assert!(value.is_none());
        cache.invalidate_list("list-1", "reading");
    }

    #[test]
    fn test_failing_store_errors_classify_as_cache_failure() {
        let err = CacheClient::get_inner::<serde_json::Value>(&DownStore, "k").unwrap_err();
        assert_eq!(err.code(), "CACHE_FAILURE");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_corrupt_entry_reads_as_miss() {
        let store = Arc::new(MemoryKvStore::new());
        store
            .set_with_expiry("bad", "{not json", Duration::from_secs(60))
            .unwrap();
        let cache = CacheClient::new(store);
        let value: Option<serde_json::Value> = cache.get_json("bad");
        assert!(value.is_none());
    }
}
