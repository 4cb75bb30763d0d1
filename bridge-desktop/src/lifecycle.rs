//! Headless worker lifecycle
//!
//! A desktop host has no waiting worker instances and no browser client
//! contexts, so activation hooks always succeed. The calls are counted so a
//! host (or a test) can tell whether activation was requested.

use async_trait::async_trait;
use bridge_traits::{error::Result, lifecycle::ActivationControl};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// [`ActivationControl`] for hosts without a service-worker runtime.
#[derive(Debug, Default)]
pub struct HeadlessActivationControl {
    skip_waiting_calls: AtomicUsize,
    claim_calls: AtomicUsize,
}

impl HeadlessActivationControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting_calls.load(Ordering::SeqCst) > 0
    }

    pub fn clients_claimed(&self) -> bool {
        self.claim_calls.load(Ordering::SeqCst) > 0
    }

    pub fn skip_waiting_calls(&self) -> usize {
        self.skip_waiting_calls.load(Ordering::SeqCst)
    }

    pub fn claim_calls(&self) -> usize {
        self.claim_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ActivationControl for HeadlessActivationControl {
    async fn skip_waiting(&self) -> Result<()> {
        self.skip_waiting_calls.fetch_add(1, Ordering::SeqCst);
        debug!("skip_waiting requested");
        Ok(())
    }

    async fn claim_clients(&self) -> Result<()> {
        self.claim_calls.fetch_add(1, Ordering::SeqCst);
        debug!("Claimed clients");
        Ok(())
    }
}
