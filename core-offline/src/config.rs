//! # Cache Configuration
//!
//! The deployed artifact of an offline cache: the generation name, the scope
//! the worker controls, and the asset manifest seeded at install time.
//!
//! Changing the generation name (or the manifest along with it) is the only
//! versioning mechanism: the next activation deletes every other generation.
//!
//! ```
//! use core_offline::CacheConfig;
//!
//! let config = CacheConfig::builder()
//!     .generation("app-v2")
//!     .scope("https://app.example/calc/")
//!     .manifest(["./", "./index.html", "./app.js"])
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.generation.as_str(), "app-v2");
//! assert_eq!(
//!     config.manifest.urls()[1].as_str(),
//!     "https://app.example/calc/index.html"
//! );
//! ```

use std::collections::HashSet;
use std::fmt;

use bridge_traits::HttpRequest;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{OfflineError, Result};

/// Name of a cache generation.
///
/// Trimmed, non-empty and free of control characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GenerationName(String);

impl GenerationName {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let trimmed = name.trim();

        if trimmed.is_empty() {
            return Err(OfflineError::InvalidConfig(
                "generation name must not be empty".to_string(),
            ));
        }
        if trimmed.chars().any(char::is_control) {
            return Err(OfflineError::InvalidConfig(format!(
                "generation name {:?} contains control characters",
                trimmed
            )));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GenerationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for GenerationName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for GenerationName {
    type Error = OfflineError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<GenerationName> for String {
    fn from(name: GenerationName) -> Self {
        name.0
    }
}

/// Ordered list of asset URLs cached at install time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AssetManifest {
    urls: Vec<Url>,
}

impl AssetManifest {
    /// Resolve raw manifest entries against `scope`.
    ///
    /// Entries may be absolute URLs or paths relative to the scope
    /// (`./`, `./index.html`). Fragments are dropped. Every entry must share
    /// the scope's origin and resolve to a distinct URL.
    pub fn resolve<I, S>(scope: &Url, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut urls = Vec::new();
        for entry in entries {
            let entry = entry.as_ref();
            let mut url = scope.join(entry).map_err(|e| {
                OfflineError::InvalidConfig(format!("invalid manifest entry {:?}: {}", entry, e))
            })?;
            url.set_fragment(None);
            urls.push(url);
        }

        let manifest = Self { urls };
        manifest.check(scope)?;
        Ok(manifest)
    }

    fn check(&self, scope: &Url) -> Result<()> {
        let mut seen = HashSet::new();
        for url in &self.urls {
            if url.origin() != scope.origin() {
                return Err(OfflineError::InvalidConfig(format!(
                    "manifest entry {} is not same-origin with scope {}",
                    url, scope
                )));
            }
            if url.fragment().is_some() {
                return Err(OfflineError::InvalidConfig(format!(
                    "manifest entry {} carries a fragment",
                    url
                )));
            }
            if !seen.insert(url.as_str()) {
                return Err(OfflineError::InvalidConfig(format!(
                    "manifest entry {} is listed more than once",
                    url
                )));
            }
        }
        Ok(())
    }

    pub fn urls(&self) -> &[Url] {
        &self.urls
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// One `GET` request per asset, in manifest order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.urls
            .iter()
            .map(|url| HttpRequest::get(url.as_str()))
            .collect()
    }
}

/// Configuration of one offline cache controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// The current generation; every other generation is stale.
    pub generation: GenerationName,
    /// Base URL the worker controls.
    pub scope: Url,
    pub manifest: AssetManifest,
}

impl CacheConfig {
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Check the scope and manifest invariants.
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.scope.scheme(), "http" | "https") {
            return Err(OfflineError::InvalidConfig(format!(
                "scope {} must be an http(s) URL",
                self.scope
            )));
        }
        self.manifest.check(&self.scope)
    }

    /// Whether a request URL shares the scope's origin.
    ///
    /// Only same-origin requests are intercepted by the worker.
    pub fn is_same_origin(&self, url: &str) -> bool {
        Url::parse(url)
            .map(|url| url.origin() == self.scope.origin())
            .unwrap_or(false)
    }
}

/// Builder for [`CacheConfig`].
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    generation: Option<String>,
    scope: Option<String>,
    manifest: Vec<String>,
}

impl CacheConfigBuilder {
    pub fn generation(mut self, name: impl Into<String>) -> Self {
        self.generation = Some(name.into());
        self
    }

    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn manifest<I, S>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.manifest = entries.into_iter().map(Into::into).collect();
        self
    }

    pub fn asset(mut self, entry: impl Into<String>) -> Self {
        self.manifest.push(entry.into());
        self
    }

    pub fn build(self) -> Result<CacheConfig> {
        let generation = GenerationName::new(self.generation.ok_or_else(|| {
            OfflineError::InvalidConfig("generation name is required".to_string())
        })?)?;

        let raw_scope = self
            .scope
            .ok_or_else(|| OfflineError::InvalidConfig("scope is required".to_string()))?;
        let scope = Url::parse(&raw_scope).map_err(|e| {
            OfflineError::InvalidConfig(format!("invalid scope {:?}: {}", raw_scope, e))
        })?;

        let manifest = AssetManifest::resolve(&scope, &self.manifest)?;
        let config = CacheConfig {
            generation,
            scope,
            manifest,
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> Url {
        Url::parse("https://app.example/calc/").unwrap()
    }

    #[test]
    fn test_generation_name_is_trimmed() {
        let name = GenerationName::new("  app-v1 ").unwrap();
        assert_eq!(name.as_str(), "app-v1");
        assert_eq!(name.to_string(), "app-v1");
    }

    #[test]
    fn test_generation_name_rejects_empty_and_control() {
        assert!(matches!(
            GenerationName::new("   "),
            Err(OfflineError::InvalidConfig(_))
        ));
        assert!(GenerationName::new("app\nv1").is_err());
    }

    #[test]
    fn test_manifest_resolves_relative_entries() {
        let manifest = AssetManifest::resolve(
            &scope(),
            ["./", "./index.html", "app.js", "/calc/app_bg.wasm#x"],
        )
        .unwrap();

        let urls: Vec<&str> = manifest.urls().iter().map(Url::as_str).collect();
        assert_eq!(
            urls,
            vec![
                "https://app.example/calc/",
                "https://app.example/calc/index.html",
                "https://app.example/calc/app.js",
                "https://app.example/calc/app_bg.wasm",
            ]
        );
    }

    #[test]
    fn test_manifest_rejects_foreign_origin() {
        let err = AssetManifest::resolve(&scope(), ["https://cdn.example/lib.js"]).unwrap_err();
        assert!(matches!(err, OfflineError::InvalidConfig(msg) if msg.contains("same-origin")));
    }

    #[test]
    fn test_manifest_rejects_duplicates_after_resolution() {
        let err = AssetManifest::resolve(&scope(), ["./index.html", "index.html#top"]).unwrap_err();
        assert!(matches!(err, OfflineError::InvalidConfig(msg) if msg.contains("more than once")));
    }

    #[test]
    fn test_manifest_requests_are_gets_in_order() {
        let manifest = AssetManifest::resolve(&scope(), ["./a.js", "./b.js"]).unwrap();
        let requests = manifest.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].url, "https://app.example/calc/a.js");
        assert_eq!(requests[1].method, bridge_traits::HttpMethod::Get);
    }

    #[test]
    fn test_builder_requires_fields() {
        assert!(CacheConfig::builder().scope("https://app.example/").build().is_err());
        assert!(CacheConfig::builder().generation("v1").build().is_err());
        assert!(CacheConfig::builder()
            .generation("v1")
            .scope("not a url")
            .build()
            .is_err());
    }

    #[test]
    fn test_builder_rejects_non_http_scope() {
        let err = CacheConfig::builder()
            .generation("v1")
            .scope("file:///srv/app/")
            .build()
            .unwrap_err();
        assert!(matches!(err, OfflineError::InvalidConfig(_)));
    }

    #[test]
    fn test_empty_manifest_is_allowed() {
        let config = CacheConfig::builder()
            .generation("v1")
            .scope("https://app.example/")
            .build()
            .unwrap();
        assert!(config.manifest.is_empty());
    }

    #[test]
    fn test_same_origin() {
        let config = CacheConfig::builder()
            .generation("v1")
            .scope("https://app.example/calc/")
            .asset("./")
            .build()
            .unwrap();

        assert!(config.is_same_origin("https://app.example/calc/index.html"));
        assert!(config.is_same_origin("https://app.example/other/"));
        assert!(!config.is_same_origin("https://cdn.example/calc/app.js"));
        assert!(!config.is_same_origin("http://app.example/calc/"));
        assert!(!config.is_same_origin("::"));
    }
}
