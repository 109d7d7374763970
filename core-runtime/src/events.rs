//! # Event Bus System
//!
//! Provides an event-driven architecture for the media cache core using
//! `tokio::sync::broadcast`. Cache storages publish lifecycle events here so
//! hosts can observe restores, creations and deletions without polling.
//!
//! ## Overview
//!
//! The event bus system consists of:
//! - **Event Types**: Strongly-typed enum hierarchies for different domains
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Wrapper for consuming events with filtering
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐    emit     ┌───────────┐
//! │ Cache Storage├────────────>│           │    subscribe    ┌────────────┐
//! └──────────────┘             │ EventBus  ├────────────────>│ Subscriber │
//! ┌──────────────┐    emit     │ (broadcast│                 └────────────┘
//! │ Restore Scan ├────────────>│  channel) │
//! └──────────────┘             └───────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CacheEvent, CoreEvent, EventBus};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut subscriber = event_bus.subscribe();
//!
//! event_bus.emit(CoreEvent::Cache(CacheEvent::Created {
//!     media_source_id: "local-cache".to_string(),
//!     media_id: "dmhy.1".to_string(),
//! })).ok();
//!
//! let received = subscriber.recv().await.unwrap();
//! assert_eq!(received.description(), "Cache created");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: Subscriber was too slow and missed `n` events.
//!   This is non-fatal; the subscriber can continue receiving new events.
//! - **`RecvError::Closed`**: All senders have been dropped. This indicates shutdown.
//!
//! Publishers treat a send with no subscribers as a no-op.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// Subscribers that can't keep up will receive `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Media cache lifecycle events
    Cache(CacheEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Cache(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Cache(CacheEvent::PersistenceFailed { .. }) => EventSeverity::Error,
            CoreEvent::Cache(CacheEvent::RestoreSkipped { .. }) => EventSeverity::Warning,
            CoreEvent::Cache(CacheEvent::RestoreCompleted { .. }) => EventSeverity::Info,
            CoreEvent::Cache(CacheEvent::Created { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (verbose)
    Debug,
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
}

// ============================================================================
// Cache Events
// ============================================================================

/// Events related to the lifecycle of cached media in one storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum CacheEvent {
    /// A new cache was created and its save record persisted.
    Created {
        media_source_id: String,
        media_id: String,
    },
    /// A cache was reconstructed from a save record during the startup scan.
    Restored {
        media_source_id: String,
        media_id: String,
    },
    /// A save record could not be turned into a live cache.
    RestoreSkipped {
        media_source_id: String,
        /// Record file name (basename only)
        file: String,
        reason: String,
    },
    /// The startup scan finished.
    RestoreCompleted {
        media_source_id: String,
        restored: u32,
        skipped: u32,
    },
    /// A cache and its save record were removed.
    Deleted {
        media_source_id: String,
        media_id: String,
    },
    /// Writing or removing a save record failed.
    PersistenceFailed {
        media_source_id: String,
        media_id: String,
        message: String,
    },
}

impl CacheEvent {
    pub fn description(&self) -> &str {
        match self {
            CacheEvent::Created { .. } => "Cache created",
            CacheEvent::Restored { .. } => "Cache restored from save record",
            CacheEvent::RestoreSkipped { .. } => "Save record skipped during restore",
            CacheEvent::RestoreCompleted { .. } => "Restore scan completed",
            CacheEvent::Deleted { .. } => "Cache deleted",
            CacheEvent::PersistenceFailed { .. } => "Save record persistence failed",
        }
    }

    /// Identifier of the storage that published the event.
    pub fn media_source_id(&self) -> &str {
        match self {
            CacheEvent::Created { media_source_id, .. }
            | CacheEvent::Restored { media_source_id, .. }
            | CacheEvent::RestoreSkipped { media_source_id, .. }
            | CacheEvent::RestoreCompleted { media_source_id, .. }
            | CacheEvent::Deleted { media_source_id, .. }
            | CacheEvent::PersistenceFailed { media_source_id, .. } => media_source_id,
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for broadcasting events to multiple subscribers.
///
/// Cloning the bus shares the underlying channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of events to buffer per subscriber.
    ///   When a subscriber falls behind by more than this amount, it will
    ///   receive a `RecvError::Lagged` error.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Creates a new event bus with the default buffer size.
    #[allow(clippy::should_implement_trait)]
    pub fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event.
    /// Returns an error if there are no active subscribers.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive events.
    ///
    /// Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
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

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
///
/// # Example
///
/// ```rust
/// use core_runtime::events::{CacheEvent, CoreEvent, EventBus, EventStream};
///
/// let event_bus = EventBus::new(100);
/// let deletions = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Cache(CacheEvent::Deleted { .. })));
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

    /// Only events that match `predicate` will be returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Keeps only cache events published by the given storage.
    pub fn for_media_source(self, media_source_id: impl Into<String>) -> Self {
        let id = media_source_id.into();
        self.filter(move |event| match event {
            CoreEvent::Cache(e) => e.media_source_id() == id,
        })
    }

    /// Receives the next event that passes the filter (if any).
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;

            let Some(filter) = &self.filter else {
                return Ok(event);
            };

            if filter(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    let Some(filter) = &self.filter else {
                        return Some(Ok(event));
                    };

                    if filter(&event) {
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

// ============================================================================
// Tests
// ============================================================================
