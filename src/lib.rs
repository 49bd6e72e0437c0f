//! # feedvisor
//!
//! **Feedvisor** keeps an aggregate video output alive while its live sources
//! come and go. Each source is watched through the arrival time of its last
//! buffer; a source that stalls for longer than the threshold Θ is routed to a
//! locally generated fallback feed and restarted until it streams again, at
//! which point routing returns to the live feed.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   ingestion probes (collaborator threads)
//!        │ touch(i)
//!        ▼
//! ┌──────────────────┐   age(i)   ┌──────────────────┐  get/set_routing   ┌──────────────────┐
//! │ LivenessTracker  │ ─────────► │  FailoverEngine  │ ─────────────────► │  RoutingControl  │
//! │ (lock-free slots)│            │  tick(now)       │  restart_source    │ (GstGraph or     │
//! └──────────────────┘            └────────▲─────────┘                    │  MemoryRouting)  │
//!                                          │ every period (drift-free)    └───┬──────▲───────┘
//!                                 ┌────────┴─────────┐                        │      │ stop/start/EOS/
//!                                 │      Ticker      │        HealthEvent     │      │ reinitialize
//!                                 └────────▲─────────┘        (mpsc channel)  │      │
//!                                          │ start/stop                       ▼      │
//! ┌─────────────────────────────────────────┴────────────────────────────────────────┴───────┐
//! │  Supervisor: start-up order ─► run loop (Triage::classify ─► Action) ─► teardown order   │
//! └───────────────────────────────────────────┬──────────────────────────────────────────────┘
//!                                             │ publish(Event)   (FailoverEngine publishes too)
//!                                             ▼
//!                                 Bus ──► subscriber_listener ──► SubscriberSet
//!                                                          ┌──────────┼──────────┐
//!                                                          ▼          ▼          ▼
//!                                                     LogWriter FallbackTracker custom
//! ```
//!
//! ### Failover table
//! ```text
//!              age <= Θ                 age > Θ
//! FALLBACK     route to live ─► LIVE    restart (every tick), stay FALLBACK
//! LIVE         no action                route to fallback ─► FALLBACK
//! ```
//!
//! ## Features
//! | Area              | Description                                                    | Key types / traits                          |
//! |-------------------|----------------------------------------------------------------|---------------------------------------------|
//! | **Liveness**      | Lock-free last-buffer timestamps per source.                   | [`LivenessTracker`]                         |
//! | **Scheduling**    | Drift-corrected periodic health checks.                        | [`Ticker`]                                  |
//! | **Failover**      | Live/fallback routing decisions and restarts.                  | [`FailoverEngine`], [`decide`]              |
//! | **Triage**        | Closed-set classification of pipeline notifications.           | [`Triage`], [`Action`], [`HealthEvent`]     |
//! | **Supervision**   | Start-up, run loop and teardown ordering.                      | [`Supervisor`]                              |
//! | **Subscriber API**| Hook into runtime events (logging, alerting, state tracking).  | [`Subscribe`], [`LogWriter`], [`FallbackTracker`] |
//! | **Errors**        | Typed errors for the runtime and the graph service.            | [`RuntimeError`], [`GraphError`]            |
//! | **Configuration** | Centralized runtime settings.                                  | [`Config`], [`Cli`]                         |
//!
//! ## Optional features
//! - `gstreamer`: exports [`GstGraph`], the GStreamer/interpipe graph service, and builds the binary.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use feedvisor::{Config, Exit, HealthEvent, HealthKind, LivenessTracker, LogWriter,
//!                 MemoryRouting, Scope, SourceSet, Subscribe, Supervisor};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cfg = Config::default();
//!     cfg.settle_per_source = Duration::ZERO;
//!
//!     let sources = Arc::new(SourceSet::from_addresses(["rtsp://cam-0", "rtsp://cam-1"]));
//!     let tracker = Arc::new(LivenessTracker::new(sources.len()));
//!     let graph = Arc::new(MemoryRouting::new(&sources));
//!
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter)];
//!     let sup = Supervisor::builder(cfg)
//!         .with_subscribers(subs)
//!         .build(sources, tracker, graph);
//!
//!     let (tx, rx) = tokio::sync::mpsc::channel(16);
//!     tx.send(HealthEvent::new(HealthKind::Eos, Scope::Aggregate)).await?;
//!
//!     let exit = sup.run_until(rx, std::future::pending()).await?;
//!     assert_eq!(exit, Exit::EndOfStream);
//!     Ok(())
//! }
//! ```
mod cli;
mod config;
mod core;
mod engine;
mod error;
mod events;
mod health;
mod liveness;
mod routing;
mod scheduler;
mod sources;
mod subscribers;
mod triage;

// ---- Public re-exports ----

pub use cli::Cli;
pub use config::Config;
pub use self::core::{Exit, Supervisor, SupervisorBuilder};
pub use engine::{Decision, FailoverEngine, TickReport, decide, is_stale};
pub use error::{GraphError, RuntimeError};
pub use events::{Bus, Event, EventKind};
pub use health::{ErrorDomain, HealthEvent, HealthKind, Origin, Scope, StatusKind};
pub use liveness::LivenessTracker;
pub use routing::{GraphOp, MemoryRouting, PipelineRef, RestartGate, RestartPermit, RoutingControl};
pub use scheduler::Ticker;
pub use sources::{Mode, Source, SourceSet};
pub use subscribers::{FallbackTracker, LogWriter, Subscribe, SubscriberSet};
pub use triage::{Action, FatalFault, Notice, Triage};

// Optional: GStreamer implementation of the graph service.
// Enable with: `--features gstreamer`
#[cfg(feature = "gstreamer")]
mod gst;
#[cfg(feature = "gstreamer")]
pub use gst::GstGraph;
