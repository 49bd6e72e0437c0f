//! In-memory graph service.
//!
//! Keeps a routing table and a log of every operation issued against it.
//! Useful for dry runs and for asserting the exact actions the core took.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use crate::error::GraphError;
use crate::sources::{Source, SourceSet};

use super::{PipelineRef, RoutingControl};

/// One operation recorded by [`MemoryRouting`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphOp {
    SetRouting { index: usize, identifier: String },
    Restart(usize),
    Stop(PipelineRef),
    Start(PipelineRef),
    EndOfStream(PipelineRef),
    Reinitialize,
}

#[derive(Default)]
struct State {
    routes: Vec<String>,
    running: HashSet<PipelineRef>,
    failing: HashSet<usize>,
    closed: bool,
    ops: Vec<GraphOp>,
}

/// Routing table and pipeline states held in memory.
///
/// Every source starts routed to its live feed with all pipelines stopped.
pub struct MemoryRouting {
    sources: Vec<Source>,
    state: Mutex<State>,
}

impl MemoryRouting {
    /// Creates a table for `sources`, each routed to its live feed.
    pub fn new(sources: &SourceSet) -> Self {
        let sources: Vec<Source> = sources.iter().cloned().collect();
        let routes = sources.iter().map(|s| s.live_id().to_string()).collect();
        Self {
            sources,
            state: Mutex::new(State {
                routes,
                ..State::default()
            }),
        }
    }

    /// Snapshot of every operation issued so far, in order.
    pub fn ops(&self) -> Vec<GraphOp> {
        self.lock().ops.clone()
    }

    /// Forgets the operation log.
    pub fn clear_ops(&self) {
        self.lock().ops.clear();
    }

    /// Number of restarts issued for `index`.
    pub fn restarts(&self, index: usize) -> usize {
        self.lock()
            .ops
            .iter()
            .filter(|op| **op == GraphOp::Restart(index))
            .count()
    }

    /// True if `pipeline` was started and not stopped since.
    pub fn is_running(&self, pipeline: PipelineRef) -> bool {
        self.lock().running.contains(&pipeline)
    }

    /// True once teardown has closed the graph.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Makes every operation on source `index` fail until [`heal`](Self::heal).
    pub fn fail_source(&self, index: usize) {
        self.lock().failing.insert(index);
    }

    /// Undoes [`fail_source`](Self::fail_source).
    pub fn heal(&self, index: usize) {
        self.lock().failing.remove(&index);
    }

    /// Overwrites a route without validation, as an out-of-band actor would.
    pub fn overwrite_route(&self, index: usize, identifier: &str) {
        if let Some(route) = self.lock().routes.get_mut(index) {
            *route = identifier.to_string();
        }
    }

    fn source(&self, index: usize) -> Result<&Source, GraphError> {
        self.sources
            .get(index)
            .ok_or(GraphError::UnknownSource { index })
    }

    fn check(&self, state: &State, index: usize) -> Result<(), GraphError> {
        if state.failing.contains(&index) {
            return Err(GraphError::StateChange {
                pipeline: PipelineRef::Source(index),
            });
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RoutingControl for MemoryRouting {
    fn get_routing(&self, index: usize) -> Result<String, GraphError> {
        self.source(index)?;
        let state = self.lock();
        self.check(&state, index)?;
        Ok(state.routes[index].clone())
    }

    fn set_routing(&self, index: usize, identifier: &str) -> Result<(), GraphError> {
        let source = self.source(index)?;
        if !source.owns(identifier) {
            return Err(GraphError::InvalidRoute {
                index,
                identifier: identifier.to_string(),
            });
        }
        let mut state = self.lock();
        self.check(&state, index)?;
        state.routes[index] = identifier.to_string();
        state.ops.push(GraphOp::SetRouting {
            index,
            identifier: identifier.to_string(),
        });
        Ok(())
    }

    fn restart_source_pipeline(&self, index: usize) -> Result<(), GraphError> {
        self.source(index)?;
        let mut state = self.lock();
        self.check(&state, index)?;
        if state.closed {
            return Ok(());
        }
        state.running.insert(PipelineRef::Source(index));
        state.ops.push(GraphOp::Restart(index));
        Ok(())
    }

    fn stop_pipeline(&self, pipeline: PipelineRef) -> Result<(), GraphError> {
        let mut state = self.lock();
        if let PipelineRef::Source(index) = pipeline {
            self.source(index)?;
            self.check(&state, index)?;
        }
        state.running.remove(&pipeline);
        state.ops.push(GraphOp::Stop(pipeline));
        Ok(())
    }

    fn start_pipeline(&self, pipeline: PipelineRef) -> Result<(), GraphError> {
        let mut state = self.lock();
        if let PipelineRef::Source(index) = pipeline {
            self.source(index)?;
            self.check(&state, index)?;
        }
        state.running.insert(pipeline);
        state.ops.push(GraphOp::Start(pipeline));
        Ok(())
    }

    fn send_end_of_stream(&self, pipeline: PipelineRef) -> Result<(), GraphError> {
        self.lock().ops.push(GraphOp::EndOfStream(pipeline));
        Ok(())
    }

    fn reinitialize_aggregate(&self) -> Result<(), GraphError> {
        let mut state = self.lock();
        state.running.insert(PipelineRef::Aggregate);
        state.ops.push(GraphOp::Reinitialize);
        Ok(())
    }

    fn close(&self) {
        self.lock().closed = true;
    }
}
