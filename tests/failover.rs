use std::sync::Arc;
use std::time::Duration;

use feedvisor::{
    Config, Event, EventKind, Exit, GraphError, GraphOp, HealthEvent, HealthKind,
    LivenessTracker, MemoryRouting, PipelineRef, RestartGate, RoutingControl, Scope, SourceSet,
    Supervisor,
};
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};

const STEP: Duration = Duration::from_millis(500);

fn drain(rx: &mut tokio::sync::broadcast::Receiver<Event>) -> Vec<Event> {
    let mut out = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        out.push(ev);
    }
    out
}

/// Two sources, threshold 10s, period 2.5s. Source 0 streams throughout;
/// source 1 goes silent at t=0 and comes back at t=23s.
#[tokio::test(start_paused = true)]
async fn stalled_source_fails_over_restarts_and_recovers() {
    let cfg = Config {
        threshold: Duration::from_secs(10),
        period: Duration::from_millis(2500),
        settle_per_source: Duration::ZERO,
        ..Config::default()
    };
    let sources = Arc::new(SourceSet::from_addresses(["rtsp://cam-0", "rtsp://cam-1"]));
    let tracker = Arc::new(LivenessTracker::new(2));
    let graph = Arc::new(MemoryRouting::new(&sources));
    let sup = Supervisor::builder(cfg).build(sources, tracker.clone(), graph.clone());
    let mut events = sup.bus.subscribe();

    let t0 = Instant::now();
    let (tx, rx) = mpsc::channel::<HealthEvent>(8);

    let feeds = async move {
        for step in 0..=60u32 {
            let at = t0 + STEP * step;
            sleep_until(at).await;
            tracker.record(0, at);
            if step == 0 || at >= t0 + Duration::from_secs(23) {
                tracker.record(1, at);
            }
        }
        drop(tx);
    };

    let (exit, ()) = tokio::join!(sup.run_until(rx, std::future::pending()), feeds);
    assert_eq!(exit.unwrap(), Exit::HealthClosed);

    assert_eq!(graph.get_routing(0).unwrap(), "live_sink_0");
    assert_eq!(graph.get_routing(1).unwrap(), "live_sink_1");
    assert_eq!(graph.restarts(0), 0);
    assert_eq!(graph.restarts(1), 4);

    let routing: Vec<(EventKind, Option<usize>, Option<u32>)> = drain(&mut events)
        .into_iter()
        .filter(|ev| {
            matches!(
                ev.kind,
                EventKind::FallbackActivated | EventKind::RestartIssued | EventKind::LiveRestored
            )
        })
        .map(|ev| (ev.kind, ev.source, ev.attempt))
        .collect();

    assert_eq!(
        routing,
        vec![
            (EventKind::FallbackActivated, Some(1), None),
            (EventKind::RestartIssued, Some(1), Some(1)),
            (EventKind::RestartIssued, Some(1), Some(2)),
            (EventKind::RestartIssued, Some(1), Some(3)),
            (EventKind::RestartIssued, Some(1), Some(4)),
            (EventKind::LiveRestored, Some(1), None),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn never_observed_sources_fall_back_on_first_tick() {
    let cfg = Config {
        settle_per_source: Duration::ZERO,
        ..Config::default()
    };
    let sources = Arc::new(SourceSet::from_addresses(["a", "b", "c"]));
    let tracker = Arc::new(LivenessTracker::new(3));
    let graph = Arc::new(MemoryRouting::new(&sources));
    let sup = Supervisor::builder(cfg).build(sources, tracker, graph.clone());

    let (tx, rx) = mpsc::channel::<HealthEvent>(1);
    let hang_up = async move {
        // first tick is at 2.5s with the default period
        tokio::time::sleep(Duration::from_millis(3000)).await;
        drop(tx);
    };
    let (exit, ()) = tokio::join!(sup.run_until(rx, std::future::pending()), hang_up);
    assert_eq!(exit.unwrap(), Exit::HealthClosed);

    for i in 0..3 {
        assert_eq!(graph.get_routing(i).unwrap(), format!("fallback_sink_{i}"));
        assert_eq!(graph.restarts(i), 0);
    }
}

/// Graph whose restarts complete in the background, the way a real pipeline
/// service issues them.
struct BackgroundRestarts {
    inner: Arc<MemoryRouting>,
    gate: Arc<RestartGate>,
    delay: Duration,
}

impl RoutingControl for BackgroundRestarts {
    fn get_routing(&self, index: usize) -> Result<String, GraphError> {
        self.inner.get_routing(index)
    }

    fn set_routing(&self, index: usize, identifier: &str) -> Result<(), GraphError> {
        self.inner.set_routing(index, identifier)
    }

    fn restart_source_pipeline(&self, index: usize) -> Result<(), GraphError> {
        let Some(permit) = self.gate.claim(index) else {
            return Ok(());
        };
        let inner = Arc::clone(&self.inner);
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            permit.run(|| {
                let _ = inner.restart_source_pipeline(index);
            });
        });
        Ok(())
    }

    fn stop_pipeline(&self, pipeline: PipelineRef) -> Result<(), GraphError> {
        let _serial = match pipeline {
            PipelineRef::Source(index) => self.gate.hold(index),
            _ => None,
        };
        self.inner.stop_pipeline(pipeline)
    }

    fn start_pipeline(&self, pipeline: PipelineRef) -> Result<(), GraphError> {
        self.inner.start_pipeline(pipeline)
    }

    fn send_end_of_stream(&self, pipeline: PipelineRef) -> Result<(), GraphError> {
        self.inner.send_end_of_stream(pipeline)
    }

    fn reinitialize_aggregate(&self) -> Result<(), GraphError> {
        self.inner.reinitialize_aggregate()
    }

    fn close(&self) {
        self.gate.close();
    }
}

#[tokio::test(start_paused = true)]
async fn background_restarts_never_outlive_teardown() {
    let cfg = Config {
        threshold: Duration::from_millis(40),
        period: Duration::from_millis(10),
        settle_per_source: Duration::ZERO,
        ..Config::default()
    };
    let sources = Arc::new(SourceSet::from_addresses(["rtsp://cam-0"]));
    let tracker = Arc::new(LivenessTracker::new(1));
    let inner = Arc::new(MemoryRouting::new(&sources));
    let graph = Arc::new(BackgroundRestarts {
        inner: Arc::clone(&inner),
        gate: Arc::new(RestartGate::new(1)),
        delay: Duration::from_millis(30),
    });
    let sup = Supervisor::builder(cfg).build(sources, tracker, graph);

    let (tx, rx) = mpsc::channel::<HealthEvent>(1);
    let end = async move {
        tokio::time::sleep(Duration::from_millis(105)).await;
        let _ = tx.send(HealthEvent::new(HealthKind::Eos, Scope::Aggregate)).await;
        tx
    };
    let (exit, _tx) = tokio::join!(sup.run_until(rx, std::future::pending()), end);
    assert_eq!(exit.unwrap(), Exit::EndOfStream);

    // let every restart still sleeping in the background wake up
    tokio::time::sleep(Duration::from_secs(1)).await;

    let ops = inner.ops();
    let stopped = ops
        .iter()
        .rposition(|op| *op == GraphOp::Stop(PipelineRef::Source(0)))
        .unwrap();
    assert!(!ops[stopped..].contains(&GraphOp::Restart(0)), "{ops:?}");
    assert!(!inner.is_running(PipelineRef::Source(0)));
    // restarts were issued while running, at most one in flight at a time
    assert!(inner.restarts(0) >= 1);
}
