//! In-memory cache storage
//!
//! Process-local implementation of the host cache store. Used by headless
//! hosts that do not need entries to survive a restart, and as the fake store
//! in tests.

use async_trait::async_trait;
use bridge_traits::{
    cache::{cache_key, is_cacheable, Cache, CacheStorage},
    error::{BridgeError, Result},
    http::{HttpRequest, HttpResponse},
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

pub(crate) fn reject_uncacheable(request: &HttpRequest) -> Result<()> {
    if is_cacheable(request) {
        Ok(())
    } else {
        Err(BridgeError::CacheStorage(format!(
            "{} requests cannot be cached: {}",
            request.method, request.url
        )))
    }
}

/// A single in-memory cache.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, HttpResponse>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn put_all(&self, entries: Vec<(HttpRequest, HttpResponse)>) -> Result<()> {
        for (request, _) in &entries {
            reject_uncacheable(request)?;
        }

        let mut map = self.entries.write();
        for (request, response) in entries {
            map.insert(cache_key(&request), response);
        }
        Ok(())
    }

    async fn match_request(&self, request: &HttpRequest) -> Result<Option<HttpResponse>> {
        if !is_cacheable(request) {
            return Ok(None);
        }
        Ok(self.entries.read().get(&cache_key(request)).cloned())
    }

    async fn put(&self, request: &HttpRequest, response: HttpResponse) -> Result<()> {
        reject_uncacheable(request)?;
        self.entries.write().insert(cache_key(request), response);
        Ok(())
    }

    async fn delete(&self, request: &HttpRequest) -> Result<bool> {
        Ok(self.entries.write().remove(&cache_key(request)).is_some())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self.entries.read().keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

/// In-memory collection of named caches.
///
/// Clones share the same caches.
#[derive(Clone, Default)]
pub struct MemoryCacheStorage {
    caches: Arc<RwLock<HashMap<String, Arc<MemoryCache>>>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn Cache>> {
        if let Some(cache) = self.caches.read().get(name) {
            return Ok(cache.clone() as Arc<dyn Cache>);
        }

        let cache: Arc<dyn Cache> = self
            .caches
            .write()
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!(cache = name, "Created in-memory cache");
                Arc::new(MemoryCache::new())
            })
            .clone();
        Ok(cache)
    }

    async fn has(&self, name: &str) -> Result<bool> {
        Ok(self.caches.read().contains_key(name))
    }

    /// Cache names in lexicographic order.
    async fn keys(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.caches.read().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        Ok(self.caches.write().remove(name).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::http::HttpMethod;

    #[tokio::test]
    async fn test_open_creates_and_reuses() {
        let storage = MemoryCacheStorage::new();
        assert!(!storage.has("v1").await.unwrap());

        let first = storage.open("v1").await.unwrap();
        first
            .put(
                &HttpRequest::get("https://app.example/"),
                HttpResponse::new(200, "home"),
            )
            .await
            .unwrap();

        let again = storage.open("v1").await.unwrap();
        let hit = again
            .match_request(&HttpRequest::get("https://app.example/#main"))
            .await
            .unwrap();
        assert_eq!(hit.unwrap().body.as_ref(), b"home");
        assert_eq!(storage.keys().await.unwrap(), vec!["v1".to_string()]);
    }

    #[tokio::test]
    async fn test_put_all_is_all_or_nothing() {
        let cache = MemoryCache::new();
        let result = cache
            .put_all(vec![
                (
                    HttpRequest::get("https://app.example/a.js"),
                    HttpResponse::new(200, "a"),
                ),
                (
                    HttpRequest::new(HttpMethod::Post, "https://app.example/api"),
                    HttpResponse::new(200, "b"),
                ),
            ])
            .await;

        assert!(matches!(result, Err(BridgeError::CacheStorage(_))));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let cache = MemoryCache::new();
        let request = HttpRequest::get("https://app.example/data.json");
        cache.put(&request, HttpResponse::new(200, "old")).await.unwrap();
        cache.put(&request, HttpResponse::new(200, "new")).await.unwrap();

        assert_eq!(cache.len(), 1);
        let stored = cache.match_request(&request).await.unwrap().unwrap();
        assert_eq!(stored.body.as_ref(), b"new");
    }

    #[tokio::test]
    async fn test_delete_cache_and_entry() {
        let storage = MemoryCacheStorage::new();
        let cache = storage.open("v1").await.unwrap();
        let request = HttpRequest::get("https://app.example/");
        cache.put(&request, HttpResponse::new(200, "x")).await.unwrap();

        assert!(cache.delete(&request).await.unwrap());
        assert!(!cache.delete(&request).await.unwrap());

        assert!(storage.delete("v1").await.unwrap());
        assert!(!storage.delete("v1").await.unwrap());
        assert!(storage.keys().await.unwrap().is_empty());
    }
}
