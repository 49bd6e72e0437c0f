//! # GStreamer pipeline graph service (feature `gstreamer`).
//!
//! Implements [`RoutingControl`](crate::RoutingControl) on top of the
//! interpipe plugin: every source and fallback feed ends in a named
//! `interpipesink`, and the aggregate reads each source through an
//! `interpipesrc` whose `listen-to` property is the routing table entry.
//!
//! ```text
//!   source-pipeline0 ─► interpipesink(live_sink_0) ─┐
//!   fallback-pipeline ─► interpipesink(fallback_sink_0) ─┤ listen-to
//!                                                        ▼
//!                             aggregate-pipeline: interpipesrc0 ─► ... ─► source_0/image_%05d.jpg
//! ```
//!
//! Bus messages of every pipeline are converted to
//! [`HealthEvent`](crate::HealthEvent)s by per-pipeline pump threads.

mod build;
mod graph;
mod messages;

pub use graph::GstGraph;
