//! Cache Storage Abstractions
//!
//! Mirrors the host's request/response cache store: a set of named caches
//! (one per generation), each mapping a request identifier to the last stored
//! response.
//!
//! - Web: the Cache API (`caches.open`, `cache.put`, `caches.delete`)
//! - Desktop: in-memory maps or a directory per cache
//!
//! Only `GET` requests are cacheable, matching the browser Cache API which
//! rejects `put` for any other method. Requests are keyed by their normalized URL
//! with the fragment removed.

use std::sync::Arc;

use crate::{
    error::Result,
    http::{HttpMethod, HttpRequest, HttpResponse},
    platform::PlatformSendSync,
};

/// Identifier a cache entry is stored under.
///
/// The URL is normalized the way the browser Cache API compares requests:
/// scheme and host are lowercased, default ports and empty paths are
/// canonicalized, and the fragment is dropped, so `https://APP.example:443`
/// and `https://app.example/#top` share an entry. Unparseable URLs are only
/// stripped of their fragment.
pub fn cache_key(request: &HttpRequest) -> String {
    url_cache_key(&request.url)
}

/// [`cache_key`] for a bare URL.
pub fn url_cache_key(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.into()
        }
        Err(_) => match url.split_once('#') {
            Some((base, _)) => base.to_string(),
            None => url.to_string(),
        },
    }
}

/// Whether the request may be stored in or served from a cache.
pub fn is_cacheable(request: &HttpRequest) -> bool {
    request.method == HttpMethod::Get
}

/// A single named cache.
///
/// Each operation is atomic for the key it touches; no cross-key coordination
/// is offered.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait Cache: PlatformSendSync {
    /// Store every entry, overwriting existing ones.
    ///
    /// Implementations should store nothing when any entry is rejected.
    async fn put_all(&self, entries: Vec<(HttpRequest, HttpResponse)>) -> Result<()>;

    /// Look up the stored response for a request.
    ///
    /// Returns `Ok(None)` when the request has no entry.
    async fn match_request(&self, request: &HttpRequest) -> Result<Option<HttpResponse>>;

    /// Store a response for a request, replacing any previous entry.
    async fn put(&self, request: &HttpRequest, response: HttpResponse) -> Result<()>;

    /// Remove the entry for a request. Returns `true` when one existed.
    async fn delete(&self, request: &HttpRequest) -> Result<bool>;

    /// List the identifiers of all stored entries.
    async fn keys(&self) -> Result<Vec<String>>;
}

/// The host's collection of named caches.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::cache::CacheStorage;
///
/// async fn prune(storage: &dyn CacheStorage, keep: &str) -> Result<()> {
///     for name in storage.keys().await? {
///         if name != keep {
///             storage.delete(&name).await?;
///         }
///     }
///     Ok(())
/// }
/// ```
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait CacheStorage: PlatformSendSync {
    /// Open the cache with the given name, creating it if absent.
    async fn open(&self, name: &str) -> Result<Arc<dyn Cache>>;

    /// Check whether a cache with the given name exists.
    async fn has(&self, name: &str) -> Result<bool>;

    /// List the names of all caches.
    async fn keys(&self) -> Result<Vec<String>>;

    /// Delete a cache and all its entries. Returns `true` when it existed.
    async fn delete(&self, name: &str) -> Result<bool>;
}
