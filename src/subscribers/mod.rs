//! # Event subscribers for the feedvisor runtime.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out
//! and the built-in subscribers for runtime events broadcast through the
//! [`Bus`](crate::Bus).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   FailoverEngine / Supervisor ── publish(Event) ──► Bus ──► subscriber_listener
//!                                                                   │
//!                                                            SubscriberSet::emit
//!                                                                   │
//!                                                  ┌────────────────┼───────────────┐
//!                                                  ▼                ▼               ▼
//!                                              LogWriter     FallbackTracker     Custom
//! ```
//!
//! ## Subscriber types
//! - **Passive subscribers** - observe and react to events (logging, alerts)
//! - **Stateful subscribers** - maintain state based on events (FallbackTracker)

mod fallback;
mod log;
mod set;
mod subscribe;

pub use fallback::FallbackTracker;
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
