//! # Runtime events emitted by the failover engine and the supervisor.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Routing events**: a source moved between live and fallback feeds
//! - **Recovery events**: restarts, isolations, aggregate repairs
//! - **Shutdown events**: end-of-stream, fatal faults, teardown
//! - **Subscriber events**: overflow and panics inside subscriber workers
//!
//! The [`Event`] struct carries additional metadata such as timestamps, source
//! index, routed identifier, reasons and restart attempt counters.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use feedvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::RestartIssued)
//!     .with_source(1)
//!     .with_attempt(3);
//!
//! assert_eq!(ev.kind, EventKind::RestartIssued);
//! assert_eq!(ev.source, Some(1));
//! assert_eq!(ev.attempt, Some(3));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Routing events ===
    /// A live source went stale and was routed to its fallback feed.
    ///
    /// Sets:
    /// - `source`: source index
    /// - `route`: fallback identifier
    /// - `age_ms`: buffer age at decision time (absent if never observed)
    FallbackActivated,

    /// A source on fallback became fresh and was routed back to its live feed.
    ///
    /// Sets:
    /// - `source`: source index
    /// - `route`: live identifier
    /// - `age_ms`: buffer age at decision time
    LiveRestored,

    /// The routing table held an identifier foreign to the source and was corrected.
    ///
    /// Sets:
    /// - `source`: source index
    /// - `route`: identifier written
    /// - `reason`: identifier found
    RoutingRepaired,

    /// A routing operation failed for one source during a tick.
    ///
    /// Sets:
    /// - `source`: source index
    /// - `reason`: collaborator error
    RoutingFailed,

    // === Recovery events ===
    /// A restart was issued for a stale source on fallback.
    ///
    /// Sets:
    /// - `source`: source index
    /// - `attempt`: consecutive restarts since the source last went to fallback (1-based)
    /// - `age_ms`: buffer age at decision time (absent if never observed)
    RestartIssued,

    /// A source pipeline was stopped after a stream/resource error.
    ///
    /// Sets:
    /// - `source`: source index
    /// - `reason`: error message
    SourceIsolated,

    /// The aggregate was stopped, drained and reinitialized after a watchdog fault.
    ///
    /// Sets:
    /// - `reason`: error message
    AggregateRestarted,

    // === Shutdown events ===
    /// A pipeline reached end-of-stream; the run loop is ending.
    EndOfStream,

    /// A fatal fault was classified; the run loop is ending.
    ///
    /// Sets:
    /// - `reason`: fault description
    FatalFault,

    /// Shutdown requested (OS signal observed).
    ShutdownRequested,

    /// Every pipeline has been stopped in teardown order.
    TeardownCompleted,

    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `reason`: subscriber name and panic info
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `reason`: subscriber name and drop reason
    SubscriberOverflow,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Debug, Clone)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Source index, if applicable.
    pub source: Option<usize>,
    /// Feed identifier written to the routing table.
    pub route: Option<Arc<str>>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Restart attempt counter (starting from 1).
    pub attempt: Option<u32>,
    /// Buffer age in milliseconds (compact).
    pub age_ms: Option<u64>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            source: None,
            route: None,
            reason: None,
            attempt: None,
            age_ms: None,
        }
    }

    /// Attaches a source index.
    #[inline]
    pub fn with_source(mut self, index: usize) -> Self {
        self.source = Some(index);
        self
    }

    /// Attaches the identifier written to the routing table.
    #[inline]
    pub fn with_route(mut self, route: impl Into<Arc<str>>) -> Self {
        self.route = Some(route.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a restart attempt counter.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a buffer age (stored as milliseconds); `None` leaves it unset.
    #[inline]
    pub fn with_age(mut self, age: Option<Duration>) -> Self {
        self.age_ms = age.map(|d| d.as_millis().min(u128::from(u64::MAX)) as u64);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_reason(format!("subscriber={subscriber} info={info}"))
    }
}
