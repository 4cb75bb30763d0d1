//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`
//! - `CacheStorage` in memory (`MemoryCacheStorage`) or on disk (`FsCacheStorage`)
//! - `ActivationControl` as a recording no-op (no service-worker runtime)
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{FsCacheStorage, HeadlessActivationControl, ReqwestHttpClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let http_client = ReqwestHttpClient::try_new()?;
//!     let storage = FsCacheStorage::in_default_location();
//!     let activation = HeadlessActivationControl::new();
//!
//!     // Use in core configuration
//!     Ok(())
//! }
//! ```

mod fs_cache;
mod http;
mod lifecycle;
mod memory;

pub use fs_cache::{FsCache, FsCacheStorage};
pub use http::ReqwestHttpClient;
pub use lifecycle::HeadlessActivationControl;
pub use memory::{MemoryCache, MemoryCacheStorage};
