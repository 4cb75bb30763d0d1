//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the offline cache core:
//! - Logging and tracing infrastructure
//! - Host bridge configuration
//! - Event bus for cache lifecycle events
//!
//! Other workspace crates depend on this one for their error conventions,
//! logging setup and event broadcasting.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use error::{Error, Result};
