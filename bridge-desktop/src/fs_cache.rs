//! Filesystem cache storage
//!
//! Persists named caches under a root directory so cached assets survive a
//! restart of the desktop host.
//!
//! ## Layout
//!
//! ```text
//! <root>/
//!   <sha256(cache name)>/
//!     generation.json          {"name": "app-v2"}
//!     entries/
//!       <sha256(cache key)>.json
//! ```
//!
//! Each entry file holds the request URL, status, headers and the base64 body.
//! Entries are written to a temporary file and renamed into place, so readers
//! never observe a partially written entry. `put_all` stages every entry
//! before replacing any, and restores the replaced files if a replacement
//! fails.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bridge_traits::{
    cache::{cache_key, is_cacheable, Cache, CacheStorage},
    error::{BridgeError, Result},
    http::{HttpRequest, HttpResponse},
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, warn};

use crate::memory::reject_uncacheable;

const GENERATION_FILE: &str = "generation.json";
const ENTRIES_DIR: &str = "entries";

fn digest(value: &str) -> String {
    format!("{:x}", Sha256::digest(value.as_bytes()))
}

fn storage_error(context: &str, err: impl std::fmt::Display) -> BridgeError {
    BridgeError::CacheStorage(format!("{}: {}", context, err))
}

/// A uniquely named file next to `path`, e.g. `<digest>.<uuid>.tmp`.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    path.with_extension(format!("{}.{}", uuid::Uuid::new_v4().simple(), suffix))
}

/// Write `contents` to a temporary file next to `path`.
async fn stage(path: &Path, contents: &[u8]) -> Result<PathBuf> {
    let tmp = sibling(path, "tmp");
    if let Err(err) = fs::write(&tmp, contents).await {
        fs::remove_file(&tmp).await.ok();
        return Err(err.into());
    }
    Ok(tmp)
}

/// Write `contents` to `path` through a uniquely named temporary file.
async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let tmp = stage(path, contents).await?;
    if let Err(err) = fs::rename(&tmp, path).await {
        fs::remove_file(&tmp).await.ok();
        return Err(err.into());
    }
    Ok(())
}

/// Move a staged file into place, keeping the replaced entry as a backup.
async fn commit(tmp: &Path, path: &Path) -> Result<Option<PathBuf>> {
    let backup = match fs::metadata(path).await {
        Ok(meta) if meta.is_file() => {
            let backup = sibling(path, "bak");
            fs::rename(path, &backup).await?;
            Some(backup)
        }
        _ => None,
    };

    if let Err(err) = fs::rename(tmp, path).await {
        if let Some(backup) = &backup {
            fs::rename(backup, path).await.ok();
        }
        return Err(err.into());
    }
    Ok(backup)
}

/// Undo committed entries, newest first.
async fn roll_back(committed: Vec<(PathBuf, Option<PathBuf>)>) {
    for (path, backup) in committed.into_iter().rev() {
        let restored = match backup {
            Some(backup) => fs::rename(&backup, &path).await,
            None => fs::remove_file(&path).await,
        };
        if let Err(err) = restored {
            warn!(path = %path.display(), error = %err, "Failed to roll back cache entry");
        }
    }
}

#[derive(Serialize, Deserialize)]
struct GenerationMarker {
    name: String,
}

/// The URL of an entry file, read without decoding the body.
#[derive(Deserialize)]
struct StoredKey {
    url: String,
}

#[derive(Serialize, Deserialize)]
struct StoredEntry {
    url: String,
    status: u16,
    headers: HashMap<String, String>,
    body: String,
}

impl StoredEntry {
    fn new(key: String, response: &HttpResponse) -> Self {
        Self {
            url: key,
            status: response.status,
            headers: response.headers.clone(),
            body: STANDARD.encode(&response.body),
        }
    }

    fn into_response(self) -> Result<HttpResponse> {
        let body = STANDARD
            .decode(self.body)
            .map_err(|e| storage_error("corrupt entry body", e))?;
        Ok(HttpResponse {
            status: self.status,
            headers: self.headers,
            body: Bytes::from(body),
        })
    }
}

/// A cache persisted in one directory.
pub struct FsCache {
    entries_dir: PathBuf,
}

impl FsCache {
    fn entry_path(&self, key: &str) -> PathBuf {
        self.entries_dir.join(format!("{}.json", digest(key)))
    }

    fn encode(&self, request: &HttpRequest, response: &HttpResponse) -> Result<(PathBuf, Vec<u8>)> {
        reject_uncacheable(request)?;
        let key = cache_key(request);
        let path = self.entry_path(&key);
        let json = serde_json::to_vec(&StoredEntry::new(key, response))
            .map_err(|e| storage_error("failed to encode entry", e))?;
        Ok((path, json))
    }
}

#[async_trait]
impl Cache for FsCache {
    /// Every entry is encoded and staged before any entry is replaced. A
    /// failed replacement restores the entries already replaced.
    async fn put_all(&self, entries: Vec<(HttpRequest, HttpResponse)>) -> Result<()> {
        let encoded = entries
            .iter()
            .map(|(request, response)| self.encode(request, response))
            .collect::<Result<Vec<_>>>()?;

        let mut staged = Vec::with_capacity(encoded.len());
        for (path, json) in encoded {
            match stage(&path, &json).await {
                Ok(tmp) => staged.push((tmp, path)),
                Err(err) => {
                    for (tmp, _) in &staged {
                        fs::remove_file(tmp).await.ok();
                    }
                    return Err(err);
                }
            }
        }

        let mut committed = Vec::with_capacity(staged.len());
        let mut pending = staged.into_iter();
        while let Some((tmp, path)) = pending.next() {
            match commit(&tmp, &path).await {
                Ok(backup) => committed.push((path, backup)),
                Err(err) => {
                    warn!(error = %err, "Cache population failed, rolling back");
                    fs::remove_file(&tmp).await.ok();
                    for (tmp, _) in pending {
                        fs::remove_file(&tmp).await.ok();
                    }
                    roll_back(committed).await;
                    return Err(err);
                }
            }
        }

        for (_, backup) in committed {
            if let Some(backup) = backup {
                fs::remove_file(&backup).await.ok();
            }
        }
        Ok(())
    }

    async fn match_request(&self, request: &HttpRequest) -> Result<Option<HttpResponse>> {
        if !is_cacheable(request) {
            return Ok(None);
        }

        let raw = match fs::read(self.entry_path(&cache_key(request))).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let stored: StoredEntry =
            serde_json::from_slice(&raw).map_err(|e| storage_error("corrupt entry", e))?;
        stored.into_response().map(Some)
    }

    async fn put(&self, request: &HttpRequest, response: HttpResponse) -> Result<()> {
        let (path, json) = self.encode(request, &response)?;
        write_atomic(&path, &json).await
    }

    async fn delete(&self, request: &HttpRequest) -> Result<bool> {
        match fs::remove_file(self.entry_path(&cache_key(request))).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut dir = match fs::read_dir(&self.entries_dir).await {
            Ok(dir) => dir,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(keys),
            Err(err) => return Err(err.into()),
        };

        while let Some(item) = dir.next_entry().await? {
            let path = item.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let raw = fs::read(&path).await?;
            match serde_json::from_slice::<StoredKey>(&raw) {
                Ok(stored) => keys.push(stored.url),
                Err(err) => warn!(error = %err, "Skipping unreadable cache entry"),
            }
        }

        keys.sort();
        Ok(keys)
    }
}

/// Named caches persisted below a root directory.
#[derive(Debug, Clone)]
pub struct FsCacheStorage {
    root: PathBuf,
}

impl FsCacheStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `<platform cache dir>/offline-cache`, falling back to the temp dir.
    pub fn in_default_location() -> Self {
        Self::new(
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("offline-cache"),
        )
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn cache_dir(&self, name: &str) -> PathBuf {
        self.root.join(digest(name))
    }

    async fn read_marker(dir: &Path) -> Result<Option<String>> {
        match fs::read(dir.join(GENERATION_FILE)).await {
            Ok(raw) => {
                let marker: GenerationMarker = serde_json::from_slice(&raw)
                    .map_err(|e| storage_error("corrupt generation marker", e))?;
                Ok(Some(marker.name))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait]
impl CacheStorage for FsCacheStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn Cache>> {
        let dir = self.cache_dir(name);
        let entries_dir = dir.join(ENTRIES_DIR);
        fs::create_dir_all(&entries_dir).await?;

        if Self::read_marker(&dir).await?.is_none() {
            let marker = serde_json::to_vec(&GenerationMarker {
                name: name.to_string(),
            })
            .map_err(|e| storage_error("failed to encode generation marker", e))?;
            write_atomic(&dir.join(GENERATION_FILE), &marker).await?;
            debug!(cache = name, "Created cache directory");
        }

        Ok(Arc::new(FsCache { entries_dir }))
    }

    async fn has(&self, name: &str) -> Result<bool> {
        Ok(Self::read_marker(&self.cache_dir(name)).await?.is_some())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(names),
            Err(err) => return Err(err.into()),
        };

        while let Some(item) = dir.next_entry().await? {
            if !item.file_type().await?.is_dir() {
                continue;
            }
            match Self::read_marker(&item.path()).await {
                Ok(Some(name)) => names.push(name),
                Ok(None) => {}
                Err(err) => warn!(error = %err, "Skipping unreadable cache directory"),
            }
        }

        names.sort();
        Ok(names)
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        match fs::remove_dir_all(self.cache_dir(name)).await {
            Ok(()) => {
                debug!(cache = name, "Deleted cache directory");
                Ok(true)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::http::HttpMethod;

    fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("offline-cache-test-{}", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_entries_survive_reopen() {
        let root = temp_root();
        let request = HttpRequest::get("https://app.example/app_bg.wasm");
        let body = Bytes::from_static(&[0x00, 0x61, 0x73, 0x6d, 0xff]);

        {
            let storage = FsCacheStorage::new(&root);
            let cache = storage.open("app-v1").await.unwrap();
            cache
                .put(
                    &request,
                    HttpResponse::new(200, body.clone())
                        .with_header("content-type", "application/wasm"),
                )
                .await
                .unwrap();
        }

        let storage = FsCacheStorage::new(&root);
        assert!(storage.has("app-v1").await.unwrap());
        assert_eq!(storage.keys().await.unwrap(), vec!["app-v1".to_string()]);

        let cache = storage.open("app-v1").await.unwrap();
        let stored = cache.match_request(&request).await.unwrap().unwrap();
        assert_eq!(stored.body, body);
        assert_eq!(
            stored.headers.get("content-type").map(String::as_str),
            Some("application/wasm")
        );
        assert_eq!(
            cache.keys().await.unwrap(),
            vec!["https://app.example/app_bg.wasm".to_string()]
        );

        fs::remove_dir_all(&root).await.ok();
    }

    #[tokio::test]
    async fn test_put_all_rejects_before_writing() {
        let root = temp_root();
        let storage = FsCacheStorage::new(&root);
        let cache = storage.open("app-v1").await.unwrap();

        let result = cache
            .put_all(vec![
                (
                    HttpRequest::get("https://app.example/"),
                    HttpResponse::new(200, "home"),
                ),
                (
                    HttpRequest::new(HttpMethod::Put, "https://app.example/"),
                    HttpResponse::new(200, "nope"),
                ),
            ])
            .await;

        assert!(result.is_err());
        assert!(cache.keys().await.unwrap().is_empty());

        fs::remove_dir_all(&root).await.ok();
    }

    #[tokio::test]
    async fn test_put_all_restores_entries_when_a_replacement_fails() {
        let root = temp_root();
        let storage = FsCacheStorage::new(&root);
        let cache = storage.open("app-v1").await.unwrap();
        let home = HttpRequest::get("https://app.example/");
        let script = HttpRequest::get("https://app.example/app.js");
        cache
            .put(&home, HttpResponse::new(200, "home v1"))
            .await
            .unwrap();

        // A directory where the script entry belongs makes its rename fail.
        let entries_dir = root.join(digest("app-v1")).join(ENTRIES_DIR);
        let blocked = entries_dir.join(format!("{}.json", digest(&cache_key(&script))));
        fs::create_dir_all(blocked.join("occupied")).await.unwrap();

        let result = cache
            .put_all(vec![
                (home.clone(), HttpResponse::new(200, "home v2")),
                (script.clone(), HttpResponse::new(200, "script v2")),
            ])
            .await;

        assert!(result.is_err());
        let stored = cache.match_request(&home).await.unwrap().unwrap();
        assert_eq!(stored.body, Bytes::from_static(b"home v1"));
        assert!(fs::metadata(&blocked).await.unwrap().is_dir());

        let mut leftovers = Vec::new();
        let mut dir = fs::read_dir(&entries_dir).await.unwrap();
        while let Some(item) = dir.next_entry().await.unwrap() {
            leftovers.push(item.file_name().to_string_lossy().into_owned());
        }
        assert_eq!(leftovers.len(), 2, "staged files left behind: {leftovers:?}");
        assert!(leftovers.iter().all(|name| name.ends_with(".json")));

        fs::remove_dir_all(&root).await.ok();
    }

    #[tokio::test]
    async fn test_keys_read_only_the_url() {
        let root = temp_root();
        let storage = FsCacheStorage::new(&root);
        let cache = storage.open("app-v1").await.unwrap();
        let entries_dir = root.join(digest("app-v1")).join(ENTRIES_DIR);
        fs::write(
            entries_dir.join("partial.json"),
            br#"{"url":"https://app.example/partial.js"}"#,
        )
        .await
        .unwrap();

        assert_eq!(
            cache.keys().await.unwrap(),
            vec!["https://app.example/partial.js".to_string()]
        );

        fs::remove_dir_all(&root).await.ok();
    }

    #[tokio::test]
    async fn test_delete_generation() {
        let root = temp_root();
        let storage = FsCacheStorage::new(&root);
        storage.open("app-v1").await.unwrap();
        storage.open("app-v2").await.unwrap();

        assert!(storage.delete("app-v1").await.unwrap());
        assert!(!storage.delete("app-v1").await.unwrap());
        assert_eq!(storage.keys().await.unwrap(), vec!["app-v2".to_string()]);

        fs::remove_dir_all(&root).await.ok();
    }

    #[tokio::test]
    async fn test_missing_root_is_empty() {
        let storage = FsCacheStorage::new(temp_root());
        assert!(storage.keys().await.unwrap().is_empty());
        assert!(!storage.has("app-v1").await.unwrap());
    }
}
