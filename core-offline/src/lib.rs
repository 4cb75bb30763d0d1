//! # Offline Asset Cache
//!
//! Network-first asset caching for a browser-hosted application, expressed
//! against the host cache store and fetch abstractions in `bridge-traits`.
//!
//! ## Overview
//!
//! - [`CacheConfig`] names the current generation, the scope and the manifest
//! - [`OfflineCacheController`] handles the install, activate and fetch events
//! - [`InstallReport`], [`ActivationReport`] and [`FetchResponse`] describe
//!   what each handler did
//!
//! One generation is current at a time. Deploying a new generation name
//! replaces the old generation wholesale on the next activation.

pub mod config;
pub mod controller;
pub mod error;
pub mod report;

pub use config::{AssetManifest, CacheConfig, CacheConfigBuilder, GenerationName};
pub use controller::OfflineCacheController;
pub use error::{OfflineError, Result};
pub use report::{
    ActivationReport, FetchResponse, InstallReport, ResponseSource, StaleDeletionFailure,
};
