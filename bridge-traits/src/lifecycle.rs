//! Worker Lifecycle Control
//!
//! Hooks the host exposes for a newly installed worker to take effect without
//! waiting for older instances to shut down.

use crate::{error::Result, platform::PlatformSendSync};

/// Activation hooks of the host worker runtime.
///
/// - **Web**: `self.skipWaiting()` and `self.clients.claim()`
/// - **Desktop**: no open client contexts; implementations only record the calls
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait ActivationControl: PlatformSendSync {
    /// Ask the host to activate this instance as soon as install completes,
    /// instead of waiting for the previous one to stop.
    async fn skip_waiting(&self) -> Result<()>;

    /// Take control of every open client context so it uses this instance
    /// without a reload.
    async fn claim_clients(&self) -> Result<()>;
}
