use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::error::GraphError;
use crate::events::{Bus, Event, EventKind};
use crate::liveness::LivenessTracker;
use crate::routing::RoutingControl;
use crate::sources::{Mode, Source, SourceSet};

use super::decision::{Decision, decide, is_stale};

/// Outcome of one [`FailoverEngine::tick`], by source index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Sources routed from live to fallback.
    pub to_fallback: Vec<usize>,
    /// Sources routed from fallback back to live.
    pub restored: Vec<usize>,
    /// Sources whose pipeline restart was issued.
    pub restarted: Vec<usize>,
    /// Sources whose routing entry was foreign and had to be rewritten.
    pub repaired: Vec<usize>,
    /// Sources whose evaluation failed on a collaborator error.
    pub failed: Vec<usize>,
}

impl TickReport {
    /// True if the tick changed nothing and issued nothing.
    pub fn is_quiet(&self) -> bool {
        self.to_fallback.is_empty()
            && self.restored.is_empty()
            && self.restarted.is_empty()
            && self.repaired.is_empty()
            && self.failed.is_empty()
    }
}

/// Mutable engine state, only touched while a tick holds the lock.
struct TickState {
    /// Consecutive restarts per source since it last went to fallback.
    attempts: Vec<u32>,
    /// Sources seen on fallback at the end of the previous tick.
    on_fallback: BTreeSet<usize>,
    /// Set by [`FailoverEngine::close`]; later ticks do nothing.
    closed: bool,
}

/// Evaluates every source against the liveness threshold and drives routing.
///
/// ### Rules
/// - Mode is re-read from [`RoutingControl::get_routing`] every tick and never cached
/// - Sources are evaluated sequentially in index order
/// - Ticks never overlap: a tick waits for the previous one to finish
/// - A collaborator error on one source does not stop the evaluation of the next
/// - After [`close`](FailoverEngine::close) no tick touches the graph again
pub struct FailoverEngine {
    sources: Arc<SourceSet>,
    tracker: Arc<LivenessTracker>,
    routing: Arc<dyn RoutingControl>,
    threshold: Duration,
    bus: Bus,
    state: Mutex<TickState>,
}

impl FailoverEngine {
    pub fn new(
        sources: Arc<SourceSet>,
        tracker: Arc<LivenessTracker>,
        routing: Arc<dyn RoutingControl>,
        threshold: Duration,
        bus: Bus,
    ) -> Self {
        let n = sources.len();
        Self {
            sources,
            tracker,
            routing,
            threshold,
            bus,
            state: Mutex::new(TickState {
                attempts: vec![0; n],
                on_fallback: BTreeSet::new(),
                closed: false,
            }),
        }
    }

    /// Staleness threshold.
    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Runs one health check over every source as of `now`.
    pub async fn tick(&self, now: Instant) -> TickReport {
        let mut state = self.state.lock().await;
        self.run_tick(&mut state, now)
    }

    /// Runs one health check as of the moment the previous tick released the engine.
    pub async fn tick_now(&self) -> TickReport {
        let mut state = self.state.lock().await;
        self.run_tick(&mut state, Instant::now())
    }

    /// Waits for an in-flight tick, then disables every later one.
    ///
    /// Returns the sources on fallback as of the last completed tick.
    pub async fn close(&self) -> Vec<usize> {
        let mut state = self.state.lock().await;
        state.closed = true;
        state.on_fallback.iter().copied().collect()
    }

    fn run_tick(&self, state: &mut TickState, now: Instant) -> TickReport {
        let mut report = TickReport::default();
        if state.closed {
            return report;
        }
        let mut on_fallback = state.on_fallback.clone();

        for source in self.sources.iter() {
            let index = source.index();
            match self.evaluate(source, now, &mut state.attempts, &mut report) {
                Ok(Mode::Fallback) => {
                    on_fallback.insert(index);
                }
                Ok(Mode::Live) => {
                    on_fallback.remove(&index);
                }
                Err(err) => {
                    error!(source = index, error = %err, label = err.as_label(), "source evaluation failed");
                    self.bus.publish(
                        Event::new(EventKind::RoutingFailed)
                            .with_source(index)
                            .with_reason(err.to_string()),
                    );
                    report.failed.push(index);
                }
            }
        }

        if on_fallback != state.on_fallback {
            info!(fallback = ?on_fallback, "fallback set changed");
            state.on_fallback = on_fallback;
        }
        if !report.is_quiet() {
            debug!(?report, "tick");
        }
        report
    }

    /// Applies the failover table to one source; returns its mode afterwards.
    fn evaluate(
        &self,
        source: &Source,
        now: Instant,
        attempts: &mut [u32],
        report: &mut TickReport,
    ) -> Result<Mode, GraphError> {
        let index = source.index();
        let age = self.tracker.age(index, now);
        let routed = self.routing.get_routing(index)?;

        let Some(mode) = source.mode_of(&routed) else {
            let target = if is_stale(age, self.threshold) {
                Mode::Fallback
            } else {
                Mode::Live
            };
            let id = source.id_for(target);
            warn!(source = index, found = %routed, route = id, "foreign routing entry; repairing");
            self.routing.set_routing(index, id)?;
            if let Some(n) = attempts.get_mut(index) {
                *n = 0;
            }
            self.bus.publish(
                Event::new(EventKind::RoutingRepaired)
                    .with_source(index)
                    .with_route(id)
                    .with_reason(routed)
                    .with_age(age),
            );
            report.repaired.push(index);
            return Ok(target);
        };

        let decision = decide(mode, age, self.threshold);
        match decision {
            Decision::Stay => {}
            Decision::SwitchToFallback => {
                let id = source.fallback_id();
                self.routing.set_routing(index, id)?;
                if let Some(n) = attempts.get_mut(index) {
                    *n = 0;
                }
                self.bus.publish(
                    Event::new(EventKind::FallbackActivated)
                        .with_source(index)
                        .with_route(id)
                        .with_age(age),
                );
                report.to_fallback.push(index);
            }
            Decision::SwitchToLive => {
                let id = source.live_id();
                self.routing.set_routing(index, id)?;
                if let Some(n) = attempts.get_mut(index) {
                    *n = 0;
                }
                self.bus.publish(
                    Event::new(EventKind::LiveRestored)
                        .with_source(index)
                        .with_route(id)
                        .with_age(age),
                );
                report.restored.push(index);
            }
            Decision::Restart => {
                self.routing.restart_source_pipeline(index)?;
                let attempt = match attempts.get_mut(index) {
                    Some(n) => {
                        *n = n.saturating_add(1);
                        *n
                    }
                    None => 1,
                };
                self.bus.publish(
                    Event::new(EventKind::RestartIssued)
                        .with_source(index)
                        .with_attempt(attempt)
                        .with_age(age),
                );
                report.restarted.push(index);
            }
        }
        Ok(decision.next_mode(mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::{GraphOp, MemoryRouting};

    const THETA: Duration = Duration::from_secs(10);

    struct Rig {
        origin: Instant,
        tracker: Arc<LivenessTracker>,
        graph: Arc<MemoryRouting>,
        engine: FailoverEngine,
        bus: Bus,
    }

    fn rig(n: usize) -> Rig {
        let sources = Arc::new(SourceSet::from_addresses(
            (0..n).map(|i| format!("rtsp://cam-{i}")),
        ));
        let origin = Instant::now();
        let tracker = Arc::new(LivenessTracker::with_origin(n, origin));
        let graph = Arc::new(MemoryRouting::new(&sources));
        let bus = Bus::new(64);
        let engine = FailoverEngine::new(
            sources,
            tracker.clone(),
            graph.clone(),
            THETA,
            bus.clone(),
        );
        Rig {
            origin,
            tracker,
            graph,
            engine,
            bus,
        }
    }

    fn at(origin: Instant, millis: u64) -> Instant {
        origin + Duration::from_millis(millis)
    }

    #[tokio::test]
    async fn stale_live_source_goes_to_fallback() {
        let r = rig(1);
        r.tracker.record(0, r.origin);
        let report = r.engine.tick(at(r.origin, 10_001)).await;
        assert_eq!(report.to_fallback, vec![0]);
        assert_eq!(r.graph.get_routing(0).unwrap(), "fallback_sink_0");
    }

    #[tokio::test]
    async fn fresh_fallback_source_returns_live() {
        let r = rig(1);
        r.graph.set_routing(0, "fallback_sink_0").unwrap();
        r.tracker.record(0, at(r.origin, 5_000));
        let report = r.engine.tick(at(r.origin, 6_000)).await;
        assert_eq!(report.restored, vec![0]);
        assert_eq!(r.graph.get_routing(0).unwrap(), "live_sink_0");
    }

    #[tokio::test]
    async fn k_stale_ticks_on_fallback_issue_k_restarts() {
        let r = rig(1);
        let mut rx = r.bus.subscribe();
        r.graph.set_routing(0, "fallback_sink_0").unwrap();

        for k in 1..=5u64 {
            r.engine.tick(at(r.origin, k * 2_500)).await;
            assert_eq!(r.graph.get_routing(0).unwrap(), "fallback_sink_0");
        }
        assert_eq!(r.graph.restarts(0), 5);

        for expected in 1..=5u32 {
            let ev = rx.recv().await.unwrap();
            assert_eq!(ev.kind, EventKind::RestartIssued);
            assert_eq!(ev.attempt, Some(expected));
        }
    }

    #[tokio::test]
    async fn routing_invariant_holds_across_ticks() {
        let r = rig(3);
        for step in 0..40u64 {
            let now = at(r.origin, step * 2_500);
            // source 0 always fresh, source 1 flaps, source 2 never observed
            r.tracker.record(0, now);
            if (step / 6) % 2 == 0 {
                r.tracker.record(1, now);
            }
            r.engine.tick(now).await;
            for i in 0..3 {
                let routed = r.graph.get_routing(i).unwrap();
                assert!(
                    routed == format!("live_sink_{i}") || routed == format!("fallback_sink_{i}"),
                    "source {i} routed to {routed}"
                );
            }
        }
        assert_eq!(r.graph.get_routing(0).unwrap(), "live_sink_0");
        assert_eq!(r.graph.get_routing(2).unwrap(), "fallback_sink_2");
    }

    #[tokio::test]
    async fn two_source_outage_and_recovery() {
        let r = rig(2);
        r.tracker.record(0, r.origin);
        r.tracker.record(1, r.origin);

        let mut became_fallback = None;
        let mut restarts_at = Vec::new();
        let mut became_live = None;

        for step in 1..=12u64 {
            let ms = step * 2_500;
            let now = at(r.origin, ms);
            r.tracker.record(0, now);
            if ms > 23_000 {
                r.tracker.record(1, at(r.origin, 23_000));
            }
            let report = r.engine.tick(now).await;

            assert!(report.to_fallback.iter().all(|i| *i == 1));
            if report.to_fallback.contains(&1) {
                became_fallback = Some(ms);
            }
            if report.restarted.contains(&1) {
                restarts_at.push(ms);
            }
            if report.restored.contains(&1) {
                became_live = Some(ms);
            }
            assert_eq!(r.graph.get_routing(0).unwrap(), "live_sink_0");
        }

        assert_eq!(became_fallback, Some(12_500));
        assert_eq!(restarts_at, vec![15_000, 17_500, 20_000, 22_500]);
        assert_eq!(became_live, Some(25_000));
        assert_eq!(r.graph.get_routing(1).unwrap(), "live_sink_1");
        assert_eq!(r.graph.restarts(0), 0);
    }

    #[tokio::test]
    async fn foreign_route_is_repaired_by_age() {
        let r = rig(2);
        r.tracker.record(0, r.origin);
        r.graph.overwrite_route(0, "live_sink_7");
        r.graph.overwrite_route(1, "bogus");

        let report = r.engine.tick(at(r.origin, 1_000)).await;
        assert_eq!(report.repaired, vec![0, 1]);
        assert_eq!(r.graph.get_routing(0).unwrap(), "live_sink_0");
        assert_eq!(r.graph.get_routing(1).unwrap(), "fallback_sink_1");
    }

    #[tokio::test]
    async fn collaborator_error_does_not_stop_other_sources() {
        let r = rig(2);
        let mut rx = r.bus.subscribe();
        r.graph.fail_source(0);

        let report = r.engine.tick(at(r.origin, 11_000)).await;
        assert_eq!(report.failed, vec![0]);
        assert_eq!(report.to_fallback, vec![1]);

        let first = rx.recv().await.unwrap();
        assert_eq!(first.kind, EventKind::RoutingFailed);
        assert_eq!(first.source, Some(0));
    }

    #[tokio::test]
    async fn quiet_tick_issues_no_operations() {
        let r = rig(2);
        let now = at(r.origin, 2_500);
        r.tracker.record(0, now);
        r.tracker.record(1, now);
        r.graph.clear_ops();

        let report = r.engine.tick(now).await;
        assert!(report.is_quiet());
        assert!(
            r.graph
                .ops()
                .iter()
                .all(|op| !matches!(op, GraphOp::SetRouting { .. } | GraphOp::Restart(_)))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn queued_tick_reads_the_clock_after_acquiring_the_engine() {
        let r = Arc::new(rig(1));
        r.tracker.record(0, Instant::now());

        let held = r.engine.state.lock().await;
        let queued = {
            let r = Arc::clone(&r);
            tokio::spawn(async move { r.engine.tick_now().await })
        };
        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_secs(11)).await;
        drop(held);

        let report = queued.await.unwrap();
        assert_eq!(report.to_fallback, vec![0]);
    }

    #[tokio::test]
    async fn closed_engine_ignores_later_ticks() {
        let r = rig(2);
        r.tracker.record(0, r.origin);
        r.engine.tick(at(r.origin, 11_000)).await;

        let on_fallback = r.engine.close().await;
        assert_eq!(on_fallback, vec![0, 1]);

        r.graph.clear_ops();
        let report = r.engine.tick(at(r.origin, 30_000)).await;
        assert!(report.is_quiet());
        assert!(r.graph.ops().is_empty());
    }
}
