//! # Failover decision engine.
//!
//! On every scheduler tick the engine walks the sources in index order, reads
//! each one's buffer age from the [`LivenessTracker`](crate::LivenessTracker)
//! and its mode from the routing table, and applies the failover table:
//!
//! ```text
//!                        tick(now)
//!                            │
//!          ┌─────────────────┼───────────────────┐
//!          ▼                 ▼                   ▼
//!     age(i, now)     get_routing(i) ──► mode_of(routed)
//!          │                 │                   │
//!          └────────► decide(mode, age, Θ) ◄─────┘
//!                            │
//!       ┌──────────────┬─────┴─────────┬────────────────┐
//!       ▼              ▼               ▼                ▼
//!     Stay       SwitchToLive   SwitchToFallback     Restart
//!                set_routing      set_routing     restart_source_pipeline
//!                (live_id)      (fallback_id)      (fire-and-forget)
//! ```
//!
//! ## Rules
//! - Stale means `age > Θ`; a never-observed source is stale.
//! - Restarts are issued on **every** stale tick while on fallback.
//! - Every transition publishes one [`Event`](crate::Event) on the bus.

mod decision;
mod failover;

pub use decision::{Decision, decide, is_stale};
pub use failover::{FailoverEngine, TickReport};
