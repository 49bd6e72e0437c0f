//! # Structured logging subscriber.
//!
//! [`LogWriter`] renders every runtime [`Event`] through `tracing`, one line per
//! event, at a level that reflects how much an operator should care.
//!
//! ## Output format (fmt layer)
//! ```text
//! WARN  feedvisor::subscribers::log: fallback activated source=1 route=fallback_sink_1 age_ms=12500
//! WARN  feedvisor::subscribers::log: restart issued source=1 attempt=2 age_ms=17500
//! INFO  feedvisor::subscribers::log: live restored source=1 route=live_sink_1 age_ms=2000
//! ERROR feedvisor::subscribers::log: fatal fault reason="internal data stream error in interpipesrc0"
//! ```

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Logs every runtime event via `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let route = e.route.as_deref();
        let reason = e.reason.as_deref();

        match e.kind {
            EventKind::FallbackActivated => {
                warn!(seq = e.seq, source = e.source, route, age_ms = e.age_ms, "fallback activated");
            }
            EventKind::LiveRestored => {
                info!(seq = e.seq, source = e.source, route, age_ms = e.age_ms, "live restored");
            }
            EventKind::RoutingRepaired => {
                warn!(seq = e.seq, source = e.source, route, found = reason, "routing repaired");
            }
            EventKind::RoutingFailed => {
                error!(seq = e.seq, source = e.source, reason, "routing failed");
            }
            EventKind::RestartIssued => {
                warn!(seq = e.seq, source = e.source, attempt = e.attempt, age_ms = e.age_ms, "restart issued");
            }
            EventKind::SourceIsolated => {
                warn!(seq = e.seq, source = e.source, reason, "source isolated");
            }
            EventKind::AggregateRestarted => {
                warn!(seq = e.seq, reason, "aggregate restarted");
            }
            EventKind::EndOfStream => {
                info!(seq = e.seq, "end of stream");
            }
            EventKind::FatalFault => {
                error!(seq = e.seq, reason, "fatal fault");
            }
            EventKind::ShutdownRequested => {
                info!(seq = e.seq, "shutdown requested");
            }
            EventKind::TeardownCompleted => {
                info!(seq = e.seq, "teardown completed");
            }
            EventKind::SubscriberPanicked | EventKind::SubscriberOverflow => {
                debug!(seq = e.seq, kind = ?e.kind, reason, "subscriber fault");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
