//! # Event Bus System
//!
//! Broadcasts cache lifecycle events using `tokio::sync::broadcast` so hosts can
//! observe installs, generation pruning and cache-served responses (for
//! example to show an "offline" banner) without coupling to the controller.
//!
//! ## Overview
//!
//! - **Event Types**: `CoreEvent` wraps one enum per lifecycle phase
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Wrapper for consuming events with filtering
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{ActivationEvent, CoreEvent, EventBus};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let event_bus = EventBus::new(16);
//! let mut stream = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Activation(ActivationEvent::StaleGenerationDeleted {
//!         generation: "app-v1".to_string(),
//!     }))
//!     .ok();
//!
//! let event = stream.recv().await.unwrap();
//! assert_eq!(event.description(), "Stale cache generation deleted");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: Subscriber was too slow and missed `n` events.
//!   Non-fatal; the subscriber continues with newer events.
//! - **`RecvError::Closed`**: All senders have been dropped.
//!
//! Emitting without subscribers returns `Err`; publishers in this workspace
//! ignore that case.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum published through the event bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Install phase events
    Install(InstallEvent),
    /// Activation phase events
    Activation(ActivationEvent),
    /// Per-request fetch events
    Fetch(FetchEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Install(e) => e.description(),
            CoreEvent::Activation(e) => e.description(),
            CoreEvent::Fetch(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Install(InstallEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Fetch(FetchEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Activation(ActivationEvent::StaleGenerationDeleteFailed { .. }) => {
                EventSeverity::Warning
            }
            CoreEvent::Fetch(FetchEvent::CacheWriteFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Install(InstallEvent::Completed { .. }) => EventSeverity::Info,
            CoreEvent::Activation(ActivationEvent::Completed { .. }) => EventSeverity::Info,
            CoreEvent::Fetch(FetchEvent::ServedFromCache { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Install Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum InstallEvent {
    /// Manifest population started.
    Started {
        generation: String,
        asset_count: usize,
    },
    /// Every manifest asset was stored; the generation is ready.
    Completed {
        generation: String,
        assets_cached: usize,
    },
    /// An asset could not be fetched; the generation will not activate.
    Failed {
        generation: String,
        message: String,
    },
}

impl InstallEvent {
    fn description(&self) -> &str {
        match self {
            InstallEvent::Started { .. } => "Cache install started",
            InstallEvent::Completed { .. } => "Cache install completed",
            InstallEvent::Failed { .. } => "Cache install failed",
        }
    }
}

// ============================================================================
// Activation Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ActivationEvent {
    StaleGenerationDeleted {
        generation: String,
    },
    StaleGenerationDeleteFailed {
        generation: String,
        message: String,
    },
    /// Pruning finished and client contexts were (or were not) claimed.
    Completed {
        generation: String,
        deleted: usize,
        failed: usize,
        clients_claimed: bool,
    },
}

impl ActivationEvent {
    fn description(&self) -> &str {
        match self {
            ActivationEvent::StaleGenerationDeleted { .. } => "Stale cache generation deleted",
            ActivationEvent::StaleGenerationDeleteFailed { .. } => {
                "Failed to delete stale cache generation"
            }
            ActivationEvent::Completed { .. } => "Cache activation completed",
        }
    }
}

// ============================================================================
// Fetch Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum FetchEvent {
    ServedFromNetwork {
        url: String,
        status: u16,
    },
    /// The network failed and a stored response was returned instead.
    ServedFromCache {
        url: String,
        status: u16,
    },
    /// The network response could not be copied into the cache.
    CacheWriteFailed {
        url: String,
        message: String,
    },
    /// The network failed and nothing was cached for the request.
    Failed {
        url: String,
        message: String,
    },
}

impl FetchEvent {
    fn description(&self) -> &str {
        match self {
            FetchEvent::ServedFromNetwork { .. } => "Response served from network",
            FetchEvent::ServedFromCache { .. } => "Response served from cache",
            FetchEvent::CacheWriteFailed { .. } => "Failed to update cache entry",
            FetchEvent::Failed { .. } => "Request failed with no cached fallback",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Clones share the same channel. Each `subscribe()` creates an independent
/// receiver that only sees events emitted after it was created.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive events.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

#[cfg(not(target_arch = "wasm32"))]
type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

#[cfg(target_arch = "wasm32")]
type EventFilter = Box<dyn Fn(&CoreEvent) -> bool>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let event_bus = EventBus::new(16);
/// let fetches = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Fetch(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv()`.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Only events matching `predicate` are returned by `recv()`.
    #[cfg(target_arch = "wasm32")]
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without waiting.
    ///
    /// Returns `None` if no matching event is currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn served_from_cache(url: &str) -> CoreEvent {
        CoreEvent::Fetch(FetchEvent::ServedFromCache {
            url: url.to_string(),
            status: 200,
        })
    }

    #[tokio::test]
    async fn test_event_bus_subscription() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);

        let _sub1 = bus.subscribe();
        let _sub2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_event_emission_no_subscribers() {
        let bus = EventBus::new(10);
        assert!(bus.emit(served_from_cache("https://app.example/")).is_err());
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        let event = CoreEvent::Install(InstallEvent::Completed {
            generation: "app-v2".to_string(),
            assets_cached: 4,
        });

        assert_eq!(bus.emit(event.clone()).unwrap(), 2);
        assert_eq!(sub1.recv().await.unwrap(), event);
        assert_eq!(sub2.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_event_stream_with_filter() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe())
            .filter(|event| matches!(event, CoreEvent::Activation(_)));

        bus.emit(served_from_cache("https://app.example/index.html"))
            .ok();

        let activation = CoreEvent::Activation(ActivationEvent::Completed {
            generation: "app-v2".to_string(),
            deleted: 1,
            failed: 0,
            clients_claimed: true,
        });
        bus.emit(activation.clone()).ok();

        assert_eq!(stream.recv().await.unwrap(), activation);
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();

        for i in 0..5 {
            bus.emit(served_from_cache(&format!("https://app.example/{}", i)))
                .ok();
        }

        assert!(matches!(sub.recv().await, Err(RecvError::Lagged(_))));
    }

    #[test]
    fn test_event_severity() {
        let failed = CoreEvent::Install(InstallEvent::Failed {
            generation: "app-v2".to_string(),
            message: "offline".to_string(),
        });
        assert_eq!(failed.severity(), EventSeverity::Error);

        let delete_failed = CoreEvent::Activation(ActivationEvent::StaleGenerationDeleteFailed {
            generation: "app-v1".to_string(),
            message: "locked".to_string(),
        });
        assert_eq!(delete_failed.severity(), EventSeverity::Warning);

        assert_eq!(
            served_from_cache("https://app.example/").severity(),
            EventSeverity::Info
        );

        let network = CoreEvent::Fetch(FetchEvent::ServedFromNetwork {
            url: "https://app.example/".to_string(),
            status: 200,
        });
        assert_eq!(network.severity(), EventSeverity::Debug);
    }

    #[test]
    fn test_event_description() {
        assert_eq!(
            served_from_cache("https://app.example/").description(),
            "Response served from cache"
        );
    }

    #[test]
    fn test_event_serialization() {
        let event = CoreEvent::Activation(ActivationEvent::StaleGenerationDeleted {
            generation: "app-v1".to_string(),
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"Activation\""));
        assert!(json.contains("app-v1"));

        let deserialized: CoreEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, event);
    }

    #[tokio::test]
    async fn test_try_recv() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe());
        assert!(stream.try_recv().is_none());

        let event = served_from_cache("https://app.example/app.js");
        bus.emit(event.clone()).ok();

        let received = stream.try_recv().unwrap().unwrap();
        assert_eq!(received, event);
    }
}
