//! Workspace placeholder crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates (`core-service`, and through it `bridge-desktop` or
//! `bridge-wasm`). Host applications can depend on `offline-cache-workspace`
//! and enable `desktop-shims` or `wasm` without wiring each crate individually.

#[cfg(any(feature = "desktop-shims", feature = "wasm"))]
pub use core_service::*;
