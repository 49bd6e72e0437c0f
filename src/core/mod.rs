//! Runtime core: orchestration and lifecycle.
//!
//! The only public API from this module is [`Supervisor`] (with its
//! [`SupervisorBuilder`] and [`Exit`] outcome), which owns start-up ordering,
//! the health-event run loop and teardown.
//!
//! Internal modules:
//! - [`supervisor`]: run loop, triage dispatch, start-up and teardown;
//! - [`builder`]: wires the bus, subscribers, engine and triage together;
//! - [`shutdown`]: cross-platform shutdown signal handling.

mod builder;
mod shutdown;
mod supervisor;

pub use builder::SupervisorBuilder;
pub use supervisor::{Exit, Supervisor};
