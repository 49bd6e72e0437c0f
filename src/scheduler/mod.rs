//! # Drift-corrected periodic scheduler.
//!
//! [`Ticker`] fires a task at a fixed period. The next fire time is always
//! `previous_scheduled + period`, never `now + period`, so task latency never
//! accumulates into the cadence.
//!
//! ## Timeline
//! ```text
//! start(D) at t0
//!   ├─ sleep_until(t0 + D)  ─► spawn(task)   (task runs on its own context)
//!   ├─ sleep_until(t0 + 2D) ─► spawn(task)
//!   └─ ...
//! stop()
//!   └─ token.cancel() ─► pending sleep aborted; spawned tasks run to completion
//! ```
//!
//! ## Rules
//! - One persistent loop per `start`, cancelled through a [`CancellationToken`]
//! - `start` while running is a no-op
//! - `start` after `stop` begins a fresh cadence from "now"
//!
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

mod ticker;

pub use ticker::Ticker;
