use std::sync::Arc;
use std::time::Duration;

use feedvisor::{
    Config, ErrorDomain, EventKind, Exit, GraphOp, HealthEvent, HealthKind, LivenessTracker,
    MemoryRouting, Origin, PipelineRef, RuntimeError, Scope, SourceSet, Supervisor,
};
use async_trait::async_trait;
use feedvisor::{Event, Subscribe};
use tokio::sync::{mpsc, oneshot};

struct Rig {
    graph: Arc<MemoryRouting>,
    sup: Supervisor,
}

fn rig(n: usize) -> Rig {
    let cfg = Config {
        settle_per_source: Duration::ZERO,
        ..Config::default()
    };
    let sources = Arc::new(SourceSet::from_addresses(
        (0..n).map(|i| format!("rtsp://cam-{i}")),
    ));
    let tracker = Arc::new(LivenessTracker::new(n));
    let graph = Arc::new(MemoryRouting::new(&sources));
    let sup = Supervisor::builder(cfg).build(sources, tracker, graph.clone());
    Rig { graph, sup }
}

fn startup_ops(n: usize) -> Vec<GraphOp> {
    let mut ops = vec![GraphOp::Start(PipelineRef::Fallback)];
    ops.extend((0..n).map(|i| GraphOp::Start(PipelineRef::Source(i))));
    ops.push(GraphOp::Start(PipelineRef::Aggregate));
    ops
}

fn teardown_ops(n: usize) -> Vec<GraphOp> {
    let mut ops = vec![GraphOp::Stop(PipelineRef::Aggregate)];
    ops.extend((0..n).map(|i| GraphOp::Stop(PipelineRef::Source(i))));
    ops.push(GraphOp::Stop(PipelineRef::Fallback));
    ops
}

fn source_error(index: usize, domain: ErrorDomain) -> HealthEvent {
    HealthEvent::new(HealthKind::Error, Scope::Source(index))
        .with_origin(Origin::Element(format!("rtspsrc{index}")))
        .with_domain(domain)
        .with_message("Could not open resource for reading.")
}

fn eos() -> HealthEvent {
    HealthEvent::new(HealthKind::Eos, Scope::Aggregate)
}

#[tokio::test(start_paused = true)]
async fn resource_error_isolates_only_that_source() {
    let r = rig(2);
    let (tx, rx) = mpsc::channel(8);
    tx.send(source_error(0, ErrorDomain::Resource)).await.unwrap();
    tx.send(eos()).await.unwrap();

    let exit = r.sup.run_until(rx, std::future::pending()).await.unwrap();
    assert_eq!(exit, Exit::EndOfStream);

    let mut expected = startup_ops(2);
    expected.push(GraphOp::Stop(PipelineRef::Source(0)));
    expected.extend(teardown_ops(2));
    assert_eq!(r.graph.ops(), expected);
}

#[tokio::test(start_paused = true)]
async fn watchdog_error_restarts_aggregate_once_and_keeps_running() {
    let r = rig(2);
    let mut events = r.sup.bus.subscribe();
    let (tx, rx) = mpsc::channel(8);
    tx.send(
        HealthEvent::new(HealthKind::Error, Scope::Aggregate)
            .with_origin(Origin::Watchdog)
            .with_domain(ErrorDomain::Core)
            .with_message("Watchdog triggered"),
    )
    .await
    .unwrap();
    // a later benign event is still consumed, then the producer hangs up
    tx.send(HealthEvent::new(
        HealthKind::Warning,
        Scope::Aggregate,
    )
    .with_detail("Impossible to configure latency"))
    .await
    .unwrap();
    drop(tx);

    let exit = r.sup.run_until(rx, std::future::pending()).await.unwrap();
    assert_eq!(exit, Exit::HealthClosed);

    let mut expected = startup_ops(2);
    expected.extend([
        GraphOp::Stop(PipelineRef::Aggregate),
        GraphOp::EndOfStream(PipelineRef::Aggregate),
        GraphOp::Reinitialize,
    ]);
    expected.extend(teardown_ops(2));
    assert_eq!(r.graph.ops(), expected);

    let mut kinds = Vec::new();
    while let Ok(ev) = events.try_recv() {
        kinds.push(ev.kind);
    }
    assert_eq!(
        kinds.iter().filter(|k| **k == EventKind::AggregateRestarted).count(),
        1
    );
    assert_eq!(kinds.last(), Some(&EventKind::TeardownCompleted));
}

#[tokio::test(start_paused = true)]
async fn fatal_source_error_ends_the_loop_after_teardown() {
    let r = rig(2);
    let (tx, rx) = mpsc::channel(8);
    tx.send(source_error(1, ErrorDomain::Core)).await.unwrap();

    let err = r
        .sup
        .run_until(rx, std::future::pending())
        .await
        .unwrap_err();
    assert_eq!(err.as_label(), "runtime_fatal");
    assert!(matches!(err, RuntimeError::Fatal { .. }));

    let mut expected = startup_ops(2);
    expected.extend(teardown_ops(2));
    assert_eq!(r.graph.ops(), expected);
    assert!(!r.sup.is_ticking());
}

#[tokio::test(start_paused = true)]
async fn shutdown_trigger_stops_everything() {
    let r = rig(1);
    let mut events = r.sup.bus.subscribe();
    let (_tx, rx) = mpsc::channel::<HealthEvent>(8);
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let trigger = async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        let _ = stop_tx.send(());
    };
    let shutdown = async move {
        let _ = stop_rx.await;
        Ok(())
    };

    let (exit, ()) = tokio::join!(r.sup.run_until(rx, shutdown), trigger);
    assert_eq!(exit.unwrap(), Exit::Signal);
    assert!(!r.graph.is_running(PipelineRef::Aggregate));
    assert!(!r.graph.is_running(PipelineRef::Source(0)));
    assert!(!r.graph.is_running(PipelineRef::Fallback));

    let mut kinds = Vec::new();
    while let Ok(ev) = events.try_recv() {
        kinds.push(ev.kind);
    }
    assert_eq!(
        kinds,
        vec![EventKind::ShutdownRequested, EventKind::TeardownCompleted]
    );
}

#[tokio::test(start_paused = true)]
async fn startup_failure_still_tears_down() {
    let r = rig(2);
    r.graph.fail_source(1);
    let (_tx, rx) = mpsc::channel::<HealthEvent>(8);

    let err = r
        .sup
        .run_until(rx, std::future::pending())
        .await
        .unwrap_err();
    assert_eq!(err.as_label(), "runtime_startup");

    assert_eq!(
        r.graph.ops(),
        vec![
            GraphOp::Start(PipelineRef::Fallback),
            GraphOp::Start(PipelineRef::Source(0)),
            GraphOp::Stop(PipelineRef::Aggregate),
            GraphOp::Stop(PipelineRef::Source(0)),
            GraphOp::Stop(PipelineRef::Fallback),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn status_and_quiet_messages_are_ignored() {
    let r = rig(1);
    let (tx, rx) = mpsc::channel(8);
    tx.send(HealthEvent::new(
        HealthKind::Status(feedvisor::StatusKind::StateChanged),
        Scope::Source(0),
    ))
    .await
    .unwrap();
    tx.send(
        HealthEvent::new(HealthKind::Unrecognized("Redirect".into()), Scope::Source(0))
            .with_origin(Origin::Element("tsdemux0".into())),
    )
    .await
    .unwrap();
    tx.send(eos()).await.unwrap();

    let exit = r.sup.run_until(rx, std::future::pending()).await.unwrap();
    assert_eq!(exit, Exit::EndOfStream);

    let mut expected = startup_ops(1);
    expected.extend(teardown_ops(1));
    assert_eq!(r.graph.ops(), expected);
}

#[tokio::test(start_paused = true)]
async fn zero_period_is_refused_before_anything_starts() {
    let sources = Arc::new(SourceSet::from_addresses(["rtsp://cam-0"]));
    let graph = Arc::new(MemoryRouting::new(&sources));
    let cfg = Config {
        threshold: Duration::ZERO,
        settle_per_source: Duration::ZERO,
        ..Config::default()
    };
    let tracker = Arc::new(LivenessTracker::new(1));
    let sup = Supervisor::builder(cfg).build(sources, tracker, graph.clone());
    let (_tx, rx) = mpsc::channel::<HealthEvent>(1);

    let err = sup.run_until(rx, std::future::pending()).await.unwrap_err();
    assert_eq!(err.as_label(), "runtime_config");
    assert_eq!(graph.ops(), teardown_ops(1));
    assert!(!sup.is_ticking());
}

struct Recorder(Arc<std::sync::Mutex<Vec<EventKind>>>);

#[async_trait]
impl Subscribe for Recorder {
    async fn on_event(&self, ev: &Event) {
        self.0.lock().unwrap().push(ev.kind);
    }
    fn name(&self) -> &'static str {
        "recorder"
    }
}

#[tokio::test(start_paused = true)]
async fn subscribers_receive_the_final_teardown_event() {
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sources = Arc::new(SourceSet::from_addresses(["rtsp://cam-0"]));
    let graph = Arc::new(MemoryRouting::new(&sources));
    let cfg = Config {
        settle_per_source: Duration::ZERO,
        ..Config::default()
    };
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(Recorder(Arc::clone(&seen)))];
    let sup = Supervisor::builder(cfg)
        .with_subscribers(subs)
        .build(sources, Arc::new(LivenessTracker::new(1)), graph);

    let (tx, rx) = mpsc::channel(1);
    tx.send(eos()).await.unwrap();
    let exit = sup.run_until(rx, std::future::pending()).await.unwrap();
    assert_eq!(exit, Exit::EndOfStream);

    // subscriber workers drain their own queues
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(
        *seen.lock().unwrap(),
        vec![EventKind::EndOfStream, EventKind::TeardownCompleted]
    );
}
