//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the offline cache core and the
//! runtime hosting it. Each trait represents a capability the core requires
//! but that is provided differently per platform (browser service worker,
//! native desktop process, test harness).
//!
//! ## Traits
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - The host `fetch`; errors only on transport failure
//!
//! ### Storage
//! - [`CacheStorage`](cache::CacheStorage) - Named request/response caches (one per generation)
//! - [`Cache`](cache::Cache) - Bulk populate, lookup, overwrite, enumerate, delete
//!
//! ### Lifecycle
//! - [`ActivationControl`](lifecycle::ActivationControl) - `skipWaiting` / `clients.claim`
//!
//! ### Utilities
//! - [`LoggerSink`](log::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate |
//! |----------|---------------------|
//! | Desktop  | `bridge-desktop`    |
//! | Web      | `bridge-wasm`       |
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Adapters
//! must report "no response at all" as [`BridgeError::Network`] so the core can
//! tell an offline episode from a storage fault.
//!
//! ## Thread Safety
//!
//! Bridge traits require `Send + Sync` on native targets and nothing on
//! `wasm32`, see [`platform::PlatformSendSync`].

pub mod cache;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod log;
pub mod platform;

pub use error::BridgeError;

// Re-export commonly used types
pub use cache::{cache_key, is_cacheable, Cache, CacheStorage};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use lifecycle::ActivationControl;
pub use log::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
