//! Cache API storage
//!
//! [`WebCacheStorage`] wraps the global `caches` object; each generation is a
//! browser `Cache`. Entries written here are visible to any other code using
//! the Cache API under the same origin.

use async_trait::async_trait;
use bridge_traits::{
    cache::{is_cacheable, Cache, CacheStorage},
    error::{BridgeError, Result as BridgeResult},
    http::{HttpRequest, HttpResponse},
};
use futures::future::try_join_all;
use js_sys::{Array, Promise};
use std::sync::Arc;
use tracing::debug;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, Response};

use crate::convert::{from_web_response, to_web_request, to_web_response};
use crate::error::WasmError;
use crate::global::GlobalScope;

async fn settle(context: &str, promise: Promise) -> BridgeResult<JsValue> {
    JsFuture::from(promise)
        .await
        .map_err(|err| BridgeError::CacheStorage(WasmError::js(context, err).to_string()))
}

fn cache_request(request: &HttpRequest) -> BridgeResult<Request> {
    if !is_cacheable(request) {
        return Err(BridgeError::CacheStorage(format!(
            "{} requests cannot be cached: {}",
            request.method, request.url
        )));
    }
    Ok(to_web_request(request, None)?)
}

/// One browser `Cache`.
pub struct WebCache {
    cache: web_sys::Cache,
}

#[async_trait(?Send)]
impl Cache for WebCache {
    /// Every request and response is converted before any write starts.
    async fn put_all(&self, entries: Vec<(HttpRequest, HttpResponse)>) -> BridgeResult<()> {
        let mut converted = Vec::with_capacity(entries.len());
        for (request, response) in &entries {
            converted.push((cache_request(request)?, to_web_response(response)?));
        }

        try_join_all(converted.iter().map(|(request, response)| {
            settle("cache.put", self.cache.put_with_request(request, response))
        }))
        .await?;
        Ok(())
    }

    async fn match_request(&self, request: &HttpRequest) -> BridgeResult<Option<HttpResponse>> {
        if !is_cacheable(request) {
            return Ok(None);
        }

        let web_request = to_web_request(request, None)?;
        let found = settle("cache.match", self.cache.match_with_request(&web_request)).await?;
        if found.is_undefined() || found.is_null() {
            return Ok(None);
        }

        let response = found
            .dyn_into::<Response>()
            .map_err(|_| WasmError::UnexpectedValue("cache.match returned a non-Response".into()))?;
        Ok(Some(from_web_response(&response).await?))
    }

    async fn put(&self, request: &HttpRequest, response: HttpResponse) -> BridgeResult<()> {
        let web_request = cache_request(request)?;
        let web_response = to_web_response(&response)?;
        settle(
            "cache.put",
            self.cache.put_with_request(&web_request, &web_response),
        )
        .await?;
        Ok(())
    }

    async fn delete(&self, request: &HttpRequest) -> BridgeResult<bool> {
        let web_request = to_web_request(request, None)?;
        let removed = settle("cache.delete", self.cache.delete_with_request(&web_request)).await?;
        Ok(removed.as_bool().unwrap_or(false))
    }

    async fn keys(&self) -> BridgeResult<Vec<String>> {
        let requests = settle("cache.keys", self.cache.keys()).await?;
        let mut urls: Vec<String> = Array::from(&requests)
            .iter()
            .filter_map(|value| value.dyn_into::<Request>().ok())
            .map(|request| request.url())
            .collect();
        urls.sort();
        Ok(urls)
    }
}

/// The global `caches` object.
pub struct WebCacheStorage {
    caches: web_sys::CacheStorage,
}

impl WebCacheStorage {
    /// Bind to `caches` of the current global scope.
    pub fn new() -> BridgeResult<Self> {
        Ok(Self::with_scope(&GlobalScope::current()?)?)
    }

    /// Bind to `caches` of an explicit scope.
    pub fn with_scope(scope: &GlobalScope) -> Result<Self, WasmError> {
        Ok(Self {
            caches: scope.caches()?,
        })
    }
}

#[async_trait(?Send)]
impl CacheStorage for WebCacheStorage {
    async fn open(&self, name: &str) -> BridgeResult<Arc<dyn Cache>> {
        let cache = settle("caches.open", self.caches.open(name))
            .await?
            .dyn_into::<web_sys::Cache>()
            .map_err(|_| WasmError::UnexpectedValue("caches.open returned a non-Cache".into()))?;
        Ok(Arc::new(WebCache { cache }))
    }

    async fn has(&self, name: &str) -> BridgeResult<bool> {
        let found = settle("caches.has", self.caches.has(name)).await?;
        Ok(found.as_bool().unwrap_or(false))
    }

    async fn keys(&self) -> BridgeResult<Vec<String>> {
        let names = settle("caches.keys", self.caches.keys()).await?;
        Ok(Array::from(&names)
            .iter()
            .filter_map(|value| value.as_string())
            .collect())
    }

    async fn delete(&self, name: &str) -> BridgeResult<bool> {
        let removed = settle("caches.delete", self.caches.delete(name))
            .await?
            .as_bool()
            .unwrap_or(false);
        debug!(cache = name, removed, "caches.delete");
        Ok(removed)
    }
}
