//! # Per-source liveness tracking.
//!
//! Records when each source last produced a media unit. Written from the
//! ingestion probes of every source pipeline, read by the failover engine on
//! each health-check tick.
//!
//! ## Architecture
//! ```text
//! source pipeline 0 ── probe ──► touch(0) ─┐
//! source pipeline 1 ── probe ──► touch(1) ─┼──► [AtomicU64; N] ──► age(i, now) ──► FailoverEngine
//! source pipeline N ── probe ──► touch(N) ─┘
//! ```
//!
//! ## Rules
//! - One slot per source; writes to different slots never interact
//! - A slot only moves forward (`fetch_max`)
//! - A slot that was never written reads as `None` (infinitely old)

mod tracker;

pub use tracker::LivenessTracker;
