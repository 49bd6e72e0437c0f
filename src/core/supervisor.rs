//! # Supervisor: owns start-up, the health-event run loop, and teardown.
//!
//! The [`Supervisor`] owns the event bus, a [`SubscriberSet`], the failover
//! engine with its [`Ticker`], and the triage classifier. It drives the graph
//! service through [`RoutingControl`] only.
//!
//! ## High-level architecture
//! ```text
//! Start-up (fixed order):
//!   check_period() > 0 ─► start(Fallback) ─► start(Source 0..N) ─► settle(N × settle_per_source) ─► start(Aggregate)
//!                                                   (interruptible by shutdown)
//!   Ticker::start(period, || engine.tick_now())
//!
//! Run loop:
//!   health_rx.recv() ─► Triage::classify ─► Action
//!                                             ├─ Ignore / Log          → continue
//!                                             ├─ Isolate{i}            → stop(Source i), continue
//!                                             ├─ RestartAggregate      → stop, EOS, reinitialize, continue
//!                                             ├─ EndOfStream           → exit Ok(Exit::EndOfStream)
//!                                             └─ Fatal(fault)          → exit Err(RuntimeError::Fatal)
//!   shutdown signal                                                    → exit Ok(Exit::Signal)
//!   every health producer dropped                                      → exit Ok(Exit::HealthClosed)
//!
//! Teardown (fixed order, always complete):
//!   Ticker::stop ─► engine.close (waits for the in-flight tick) ─► routing.close (fences restarts)
//!     ─► stop(Aggregate) ─► stop(Source 0..N) ─► stop(Fallback) ─► TeardownCompleted
//!
//! Event flow:
//!   FailoverEngine / Supervisor ── publish(Event) ──► Bus ──► subscriber_listener ──► SubscriberSet::emit
//! ```
//!
//! ## Rules
//! - Teardown runs on every exit path, including start-up failures.
//! - A failing teardown step is logged; the remaining steps still run.
//! - No tick and no source restart reaches the graph once teardown stops pipelines.
//! - Subscribers are handed every event up to and including `TeardownCompleted`.
//! - Only the aggregate restart sequence blocks inside the run loop.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::core::{builder::SupervisorBuilder, shutdown};
use crate::engine::FailoverEngine;
use crate::error::{GraphError, RuntimeError};
use crate::events::{Bus, Event, EventKind};
use crate::health::HealthEvent;
use crate::routing::{PipelineRef, RoutingControl};
use crate::scheduler::Ticker;
use crate::sources::SourceSet;
use crate::subscribers::{FallbackTracker, SubscriberSet};
use crate::triage::{Action, Notice, Triage};
use crate::config::Config;

/// Why the run loop ended without a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// A pipeline reached end-of-stream.
    EndOfStream,
    /// A shutdown signal arrived.
    Signal,
    /// Every health event producer hung up.
    HealthClosed,
}

type ShutdownFuture<'a> = Pin<&'a mut (dyn Future<Output = std::io::Result<()>> + Send)>;

/// Coordinates start-up, health-event triage, failover ticks and teardown.
pub struct Supervisor {
    /// Global runtime configuration.
    pub cfg: Config,
    /// Event bus shared with the failover engine.
    pub bus: Bus,
    subs: Arc<SubscriberSet>,
    fallback: Arc<FallbackTracker>,
    sources: Arc<SourceSet>,
    routing: Arc<dyn RoutingControl>,
    engine: Arc<FailoverEngine>,
    triage: Triage,
    ticker: Ticker,
}

impl Supervisor {
    /// Returns a builder for the given configuration.
    pub fn builder(cfg: Config) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg)
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new_internal(
        cfg: Config,
        bus: Bus,
        subs: Arc<SubscriberSet>,
        fallback: Arc<FallbackTracker>,
        sources: Arc<SourceSet>,
        routing: Arc<dyn RoutingControl>,
        engine: Arc<FailoverEngine>,
        triage: Triage,
        ticker: Ticker,
    ) -> Self {
        Self {
            cfg,
            bus,
            subs,
            fallback,
            sources,
            routing,
            engine,
            triage,
            ticker,
        }
    }

    /// Failover engine driven by this supervisor's ticker.
    pub fn engine(&self) -> &Arc<FailoverEngine> {
        &self.engine
    }

    /// Tracker of the sources currently on fallback.
    pub fn fallback_tracker(&self) -> &Arc<FallbackTracker> {
        &self.fallback
    }

    /// True while the health-check ticker is running.
    pub fn is_ticking(&self) -> bool {
        self.ticker.is_running()
    }

    /// Runs until end-of-stream, a fatal fault, or an OS termination signal.
    pub async fn run(&self, health: mpsc::Receiver<HealthEvent>) -> Result<Exit, RuntimeError> {
        self.run_until(health, shutdown::wait_for_shutdown_signal())
            .await
    }

    /// Same as [`run`](Self::run), with a caller-provided shutdown trigger.
    ///
    /// `shutdown` resolving to `Ok` is treated like a termination signal; an
    /// `Err` surfaces as [`RuntimeError::Signal`].
    pub async fn run_until<S>(
        &self,
        mut health: mpsc::Receiver<HealthEvent>,
        shutdown: S,
    ) -> Result<Exit, RuntimeError>
    where
        S: Future<Output = std::io::Result<()>> + Send,
    {
        let listener = self.subscriber_listener();
        let mut shutdown = std::pin::pin!(shutdown);
        let shutdown: ShutdownFuture<'_> = shutdown.as_mut();

        let outcome = self.drive(&mut health, shutdown).await;
        self.teardown().await;

        match &outcome {
            Ok(exit) => info!(?exit, "run loop finished"),
            Err(err) => error!(error = %err, label = err.as_label(), "run loop failed"),
        }
        if let Err(err) = listener.await {
            warn!(error = %err, "subscriber listener ended abnormally");
        }
        outcome
    }

    /// Start-up followed by the health-event loop.
    async fn drive(
        &self,
        health: &mut mpsc::Receiver<HealthEvent>,
        mut shutdown: ShutdownFuture<'_>,
    ) -> Result<Exit, RuntimeError> {
        if let Some(exit) = self.startup(shutdown.as_mut()).await? {
            return Ok(exit);
        }
        self.start_ticker()?;

        loop {
            tokio::select! {
                biased;
                res = shutdown.as_mut() => return self.on_shutdown(res),
                ev = health.recv() => match ev {
                    Some(ev) => {
                        if let Some(outcome) = self.handle(&ev) {
                            return outcome;
                        }
                    }
                    None => {
                        warn!("health event channel closed");
                        return Ok(Exit::HealthClosed);
                    }
                },
            }
        }
    }

    /// Starts pipelines in order. Returns `Some(exit)` if shutdown arrived while settling.
    async fn startup(&self, shutdown: ShutdownFuture<'_>) -> Result<Option<Exit>, RuntimeError> {
        if self.cfg.check_period().is_zero() {
            error!(threshold = ?self.cfg.threshold, "health-check period is zero");
            return Err(RuntimeError::Config {
                reason: "health-check period must be non-zero".to_string(),
            });
        }

        let start = |pipeline: PipelineRef| {
            self.routing.start_pipeline(pipeline).map_err(|source| {
                error!(%pipeline, error = %source, "pipeline failed to start");
                RuntimeError::Startup { source }
            })
        };

        start(PipelineRef::Fallback)?;
        for source in self.sources.iter() {
            start(PipelineRef::Source(source.index()))?;
        }

        let settle = self.cfg.settle_delay(self.sources.len());
        debug!(settle_ms = settle.as_millis() as u64, "waiting for sources to settle");
        tokio::select! {
            biased;
            res = shutdown => return self.on_shutdown(res).map(Some),
            _ = tokio::time::sleep(settle) => {}
        }

        start(PipelineRef::Aggregate)?;
        info!(sources = self.sources.len(), "pipelines started");
        Ok(None)
    }

    fn start_ticker(&self) -> Result<(), RuntimeError> {
        let period = self.cfg.check_period();
        let engine = Arc::clone(&self.engine);
        let started = self.ticker.start(period, move || {
            let engine = Arc::clone(&engine);
            async move {
                engine.tick_now().await;
            }
        });
        if !started {
            return Err(RuntimeError::Config {
                reason: "health checks could not be scheduled".to_string(),
            });
        }
        info!(
            period_ms = period.as_millis() as u64,
            threshold_ms = self.cfg.threshold.as_millis() as u64,
            "health checks scheduled"
        );
        Ok(())
    }

    fn on_shutdown(&self, res: std::io::Result<()>) -> Result<Exit, RuntimeError> {
        match res {
            Ok(()) => {
                self.bus.publish(Event::new(EventKind::ShutdownRequested));
                Ok(Exit::Signal)
            }
            Err(source) => Err(RuntimeError::Signal { source }),
        }
    }

    /// Applies the triage action for one event. Returns `Some` when the loop must end.
    fn handle(&self, ev: &HealthEvent) -> Option<Result<Exit, RuntimeError>> {
        let action = self.triage.classify(ev);
        trace!(scope = %ev.scope, origin = %ev.origin, action = action.as_label(), "health event");

        match action {
            Action::Ignore => None,
            Action::Log(Notice::Warning {
                scope,
                origin,
                message,
                detail,
            }) => {
                warn!(%scope, %origin, %detail, "{message}");
                None
            }
            Action::Log(Notice::Unrecognized {
                scope,
                origin,
                kind,
            }) => {
                info!(%scope, %origin, %kind, "unrecognized pipeline message");
                None
            }
            Action::Isolate { source } => {
                self.isolate(source, ev);
                None
            }
            Action::RestartAggregate => {
                self.restart_aggregate(ev);
                None
            }
            Action::EndOfStream => {
                info!(scope = %ev.scope, "end of stream");
                self.bus.publish(Event::new(EventKind::EndOfStream));
                Some(Ok(Exit::EndOfStream))
            }
            Action::Fatal(fault) => {
                error!(%fault, "fatal pipeline fault");
                self.bus
                    .publish(Event::new(EventKind::FatalFault).with_reason(fault.to_string()));
                Some(Err(RuntimeError::Fatal { fault }))
            }
        }
    }

    /// Stops one source pipeline; the failover engine takes it from there.
    fn isolate(&self, index: usize, ev: &HealthEvent) {
        warn!(source = index, origin = %ev.origin, message = %ev.message, "isolating source");
        match self.routing.stop_pipeline(PipelineRef::Source(index)) {
            Ok(()) => self.bus.publish(
                Event::new(EventKind::SourceIsolated)
                    .with_source(index)
                    .with_reason(ev.message.as_str()),
            ),
            Err(err) => error!(source = index, error = %err, "failed to isolate source"),
        }
    }

    /// Stop, drain and reinitialize the aggregate. Each step runs even if the previous failed.
    fn restart_aggregate(&self, ev: &HealthEvent) {
        warn!(origin = %ev.origin, message = %ev.message, "watchdog fault; restarting aggregate");
        let steps: [(&str, Result<(), GraphError>); 3] = [
            ("stop", self.routing.stop_pipeline(PipelineRef::Aggregate)),
            (
                "end_of_stream",
                self.routing.send_end_of_stream(PipelineRef::Aggregate),
            ),
            ("reinitialize", self.routing.reinitialize_aggregate()),
        ];
        for (step, res) in steps {
            if let Err(err) = res {
                error!(step, error = %err, "aggregate restart step failed");
            }
        }
        self.bus.publish(
            Event::new(EventKind::AggregateRestarted).with_reason(ev.message.as_str()),
        );
    }

    /// Stops everything in the fixed teardown order.
    async fn teardown(&self) {
        if self.ticker.stop() {
            debug!("health checks stopped");
        }
        let on_fallback = self.engine.close().await;
        self.routing.close();

        let mut order = Vec::with_capacity(self.sources.len() + 2);
        order.push(PipelineRef::Aggregate);
        order.extend(self.sources.iter().map(|s| PipelineRef::Source(s.index())));
        order.push(PipelineRef::Fallback);

        for pipeline in order {
            if let Err(err) = self.routing.stop_pipeline(pipeline) {
                error!(%pipeline, error = %err, "failed to stop pipeline during teardown");
            }
        }

        info!(fallback = ?on_fallback, "teardown completed");
        self.bus.publish(Event::new(EventKind::TeardownCompleted));
    }

    /// Subscribes to the bus and forwards events to the subscriber set.
    ///
    /// Ends after forwarding `TeardownCompleted`, the last event of a run.
    fn subscriber_listener(&self) -> JoinHandle<()> {
        let mut rx = self.bus.subscribe();
        let set = Arc::clone(&self.subs);
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => {
                        set.emit(&ev);
                        if ev.kind == EventKind::TeardownCompleted {
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "subscriber listener lagged");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}
