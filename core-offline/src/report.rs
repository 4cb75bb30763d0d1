//! Outcomes of the controller's lifecycle handlers.

use bridge_traits::HttpResponse;
use serde::{Deserialize, Serialize};

/// Result of a successful install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallReport {
    pub generation: String,
    pub assets_cached: usize,
}

/// A stale generation that could not be deleted during activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaleDeletionFailure {
    pub generation: String,
    pub reason: String,
}

/// Result of an activation.
///
/// Deletion attempts are independent; `failed` lists the ones that did not
/// succeed while every other stale generation is in `deleted`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationReport {
    pub generation: String,
    pub deleted: Vec<String>,
    pub failed: Vec<StaleDeletionFailure>,
    pub clients_claimed: bool,
}

impl ActivationReport {
    /// Every stale generation is gone and open clients were claimed.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.clients_claimed
    }
}

/// Where a fetch response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseSource {
    Network,
    Cache,
}

/// Response handed back to the requester.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse {
    pub response: HttpResponse,
    pub source: ResponseSource,
}

impl FetchResponse {
    pub fn from_network(response: HttpResponse) -> Self {
        Self {
            response,
            source: ResponseSource::Network,
        }
    }

    pub fn from_cache(response: HttpResponse) -> Self {
        Self {
            response,
            source: ResponseSource::Cache,
        }
    }

    pub fn is_from_cache(&self) -> bool {
        self.source == ResponseSource::Cache
    }
}
