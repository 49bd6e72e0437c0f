use std::sync::Arc;

use crate::{
    config::Config,
    engine::FailoverEngine,
    events::Bus,
    liveness::LivenessTracker,
    routing::RoutingControl,
    scheduler::Ticker,
    sources::SourceSet,
    subscribers::{FallbackTracker, Subscribe, SubscriberSet},
    triage::Triage,
};

use super::supervisor::Supervisor;

/// Builder for constructing a [`Supervisor`].
pub struct SupervisorBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl SupervisorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (routing transitions, restarts,
    /// faults) through dedicated workers with bounded queues. A
    /// [`FallbackTracker`] is always added.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the supervisor around a graph service.
    ///
    /// `tracker` must be the same instance the graph's ingestion probes write to.
    /// Must be called from inside a tokio runtime (subscriber workers are spawned here).
    pub fn build(
        self,
        sources: Arc<SourceSet>,
        tracker: Arc<LivenessTracker>,
        routing: Arc<dyn RoutingControl>,
    ) -> Supervisor {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());

        let fallback = Arc::new(FallbackTracker::new());
        let mut subscribers = self.subscribers;
        subscribers.push(fallback.clone());
        let subs = Arc::new(SubscriberSet::new(subscribers, bus.clone()));

        let engine = Arc::new(FailoverEngine::new(
            Arc::clone(&sources),
            tracker,
            Arc::clone(&routing),
            self.cfg.threshold,
            bus.clone(),
        ));
        let triage = Triage::from_config(&self.cfg);

        Supervisor::new_internal(
            self.cfg,
            bus,
            subs,
            fallback,
            sources,
            routing,
            engine,
            triage,
            Ticker::new(),
        )
    }
}
