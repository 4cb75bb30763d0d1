//! WebAssembly Bridge Implementations
//!
//! Browser implementations of the traits defined in `bridge-traits`, built on
//! `web-sys` and `wasm-bindgen`:
//!
//! - [`WebCacheStorage`]: the Cache API (`caches.open`, `cache.put`, `caches.delete`)
//! - [`WorkerHttpClient`]: the global `fetch` of a window or worker
//! - [`ServiceWorkerActivation`]: `skipWaiting()` and `clients.claim()`
//!
//! # Platform Support
//!
//! This crate is designed exclusively for the `wasm32-unknown-unknown` target.
//! It compiles to an empty crate elsewhere.
//!
//! # Examples
//!
//! ```ignore
//! use bridge_traits::cache::CacheStorage;
//! use bridge_wasm::WebCacheStorage;
//!
//! let storage = WebCacheStorage::new()?;
//! for name in storage.keys().await? {
//!     web_sys::console::log_1(&name.into());
//! }
//! ```

#![cfg(target_arch = "wasm32")]
#![warn(missing_docs)]

pub mod bootstrap;
pub mod cache_storage;
pub mod clients;
pub mod convert;
pub mod error;
pub mod global;
pub mod http;

// Re-export commonly used types
pub use bootstrap::{build_wasm_bridges, WasmBridgeSet};
pub use cache_storage::{WebCache, WebCacheStorage};
pub use clients::ServiceWorkerActivation;
pub use error::{WasmError, WasmResult};
pub use global::GlobalScope;
pub use http::WorkerHttpClient;
