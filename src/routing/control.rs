use std::fmt;

use crate::error::GraphError;

/// Names one of the pipelines owned by the graph service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineRef {
    /// The single downstream consumer of every routed feed.
    Aggregate,
    /// The ingestion pipeline of one source.
    Source(usize),
    /// The synthetic feed generator shared by all sources.
    Fallback,
}

impl fmt::Display for PipelineRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineRef::Aggregate => f.write_str("aggregate"),
            PipelineRef::Source(i) => write!(f, "source-{i}"),
            PipelineRef::Fallback => f.write_str("fallback"),
        }
    }
}

/// # Pipeline graph operations consumed by the failover core.
///
/// Implementations must be callable from any thread. All operations are
/// expected to return quickly; long state transitions happen in the background.
///
/// # Example
/// ```
/// use feedvisor::{MemoryRouting, PipelineRef, RoutingControl, SourceSet};
///
/// let sources = SourceSet::from_addresses(["rtsp://cam-0"]);
/// let graph = MemoryRouting::new(&sources);
///
/// graph.set_routing(0, "fallback_sink_0").unwrap();
/// assert_eq!(graph.get_routing(0).unwrap(), "fallback_sink_0");
/// graph.stop_pipeline(PipelineRef::Source(0)).unwrap();
/// ```
pub trait RoutingControl: Send + Sync + 'static {
    /// Returns the identifier the aggregate currently reads for `index`.
    fn get_routing(&self, index: usize) -> Result<String, GraphError>;

    /// Routes `index` to `identifier`.
    fn set_routing(&self, index: usize, identifier: &str) -> Result<(), GraphError>;

    /// Issues a full stop/start cycle of the source pipeline.
    ///
    /// Fire-and-forget: returns once the restart has been scheduled, without
    /// waiting for the pipeline to become ready. Safe to call repeatedly,
    /// including on an already stopped pipeline; a call made while a restart
    /// of the same source is still pending may be coalesced into it.
    fn restart_source_pipeline(&self, index: usize) -> Result<(), GraphError>;

    /// Stops a pipeline.
    fn stop_pipeline(&self, pipeline: PipelineRef) -> Result<(), GraphError>;

    /// Starts a pipeline.
    fn start_pipeline(&self, pipeline: PipelineRef) -> Result<(), GraphError>;

    /// Pushes an end-of-stream into a pipeline.
    fn send_end_of_stream(&self, pipeline: PipelineRef) -> Result<(), GraphError>;

    /// Rebuilds/restarts the aggregate after a watchdog fault.
    fn reinitialize_aggregate(&self) -> Result<(), GraphError>;

    /// Called once at teardown, before any pipeline is stopped.
    ///
    /// After `close` returns, no restart issued earlier may start a source
    /// pipeline again. A restart already mid-flight must finish before the
    /// matching `stop_pipeline` takes effect.
    fn close(&self) {}
}
