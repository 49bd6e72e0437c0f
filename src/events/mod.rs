//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to runtime events emitted by the failover engine and the
//! supervisor. These are observability events about what the runtime *did*;
//! they are distinct from [`HealthEvent`](crate::HealthEvent)s, which are
//! what the pipelines *reported*.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `FailoverEngine` (routing transitions, restarts),
//!   `Supervisor` (isolation, aggregate restarts, shutdown), `SubscriberSet`
//!   workers (overflow/panic).
//! - **Consumers**: `Supervisor::subscriber_listener()` which fans out to the
//!   `SubscriberSet` (`LogWriter`, `FallbackTracker`, user subscribers).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
