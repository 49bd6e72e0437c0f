//! # Event triage.
//!
//! Classifies every [`HealthEvent`](crate::HealthEvent) into exactly one
//! [`Action`] for the run loop. The classification is a pure function over
//! the event's structured fields plus two configurable pattern lists.
//!
//! ## Action table
//! ```text
//! Eos                                      ─► EndOfStream
//! Warning  (benign detail)                 ─► Ignore
//! Warning                                  ─► Log(Warning)
//! Error    Aggregate / Watchdog            ─► RestartAggregate
//! Error    Aggregate / Bridge              ─► Fatal(Bridge)     (internal-stream flagged)
//! Error    Aggregate / other               ─► Fatal(Aggregate)
//! Error    Source(i) / stream|resource     ─► Isolate(i)
//! Error    Source(i) / other domain        ─► Fatal(Source)
//! Error    Fallback                        ─► Fatal(Fallback)
//! Status(_)                                ─► Ignore
//! Unrecognized (quiet origin)              ─► Ignore
//! Unrecognized                             ─► Log(Unrecognized)
//! ```

mod action;
mod classify;

pub use action::{Action, FatalFault, Notice};
pub use classify::Triage;
