//! # Routing control: the contract between the failover core and the pipeline graph.
//!
//! The core never builds pipelines. It talks to whatever owns them through
//! [`RoutingControl`]:
//!
//! ```text
//!                 get_routing / set_routing
//! FailoverEngine ───────────────────────────┐
//!                 restart_source_pipeline    │
//!                                            ▼
//!                                   ┌──────────────────┐
//! Supervisor ──── stop / start ───► │  RoutingControl  │ ◄── GstGraph (feature "gstreamer")
//!            ──── send_end_of_stream│                  │ ◄── MemoryRouting (in-memory)
//!            ──── reinitialize ───► └──────────────────┘
//! ```
//!
//! ## Rules
//! - The routing table belongs to the implementation; the core re-reads it
//!   every tick and never caches a mode.
//! - `restart_source_pipeline` is fire-and-forget and safe to repeat.
//! - `close` fences restarts before teardown; see [`RestartGate`].

mod control;
mod gate;
mod memory;

pub use control::{PipelineRef, RoutingControl};
pub use gate::{RestartGate, RestartPermit};
pub use memory::{GraphOp, MemoryRouting};
