use std::sync::Arc;

use gstreamer as gst;
use gstreamer::prelude::*;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::GraphError;
use crate::health::{HealthEvent, Scope};
use crate::liveness::LivenessTracker;
use crate::routing::{PipelineRef, RestartGate, RoutingControl};
use crate::sources::SourceSet;

use super::{build, messages};

/// Pipeline graph backed by GStreamer and the interpipe plugin.
///
/// Owns one ingestion pipeline per source, one fallback generator and one
/// aggregate. The routing table is the `listen-to` property of each
/// aggregate `interpipesrc`.
pub struct GstGraph {
    sources: Arc<SourceSet>,
    fallback: gst::Pipeline,
    source_pipelines: Vec<gst::Pipeline>,
    aggregate: gst::Pipeline,
    bridges: Vec<gst::Element>,
    restarts: Arc<RestartGate>,
}

impl GstGraph {
    /// Initialises GStreamer, builds every pipeline and starts forwarding their
    /// bus messages. Nothing is started yet.
    ///
    /// Returns the graph and the receiving end of the health event channel.
    pub fn build(
        sources: Arc<SourceSet>,
        tracker: Arc<LivenessTracker>,
        cfg: &Config,
    ) -> Result<(Self, mpsc::Receiver<HealthEvent>), GraphError> {
        gst::init().map_err(|e| GraphError::Init {
            reason: e.to_string(),
        })?;

        let fallback = build::fallback_pipeline(&sources, cfg)?;
        let source_pipelines = sources
            .iter()
            .map(|s| build::source_pipeline(s, cfg, Arc::clone(&tracker)))
            .collect::<Result<Vec<_>, _>>()?;
        let (aggregate, bridges) = build::aggregate_pipeline(&sources, cfg)?;

        let (tx, rx) = mpsc::channel(cfg.health_capacity.max(1));
        messages::spawn_pump(&fallback, Scope::Fallback, tx.clone())?;
        for (i, pipeline) in source_pipelines.iter().enumerate() {
            messages::spawn_pump(pipeline, Scope::Source(i), tx.clone())?;
        }
        messages::spawn_pump(&aggregate, Scope::Aggregate, tx)?;
        let restarts = Arc::new(RestartGate::new(sources.len()));

        info!(
            sources = sources.len(),
            watchdog = cfg.watchdog().is_some(),
            output_dir = %cfg.output_dir.display(),
            "pipeline graph built"
        );
        Ok((
            Self {
                sources,
                fallback,
                source_pipelines,
                aggregate,
                bridges,
                restarts,
            },
            rx,
        ))
    }

    fn pipeline(&self, pipeline: PipelineRef) -> Result<&gst::Pipeline, GraphError> {
        match pipeline {
            PipelineRef::Aggregate => Ok(&self.aggregate),
            PipelineRef::Fallback => Ok(&self.fallback),
            PipelineRef::Source(index) => self
                .source_pipelines
                .get(index)
                .ok_or(GraphError::UnknownSource { index }),
        }
    }

    fn bridge(&self, index: usize) -> Result<&gst::Element, GraphError> {
        self.bridges
            .get(index)
            .ok_or(GraphError::UnknownSource { index })
    }

    fn set_state(&self, pipeline: PipelineRef, state: gst::State) -> Result<(), GraphError> {
        self.pipeline(pipeline)?
            .set_state(state)
            .map(|_| ())
            .map_err(|_| GraphError::StateChange { pipeline })
    }
}

impl RoutingControl for GstGraph {
    fn get_routing(&self, index: usize) -> Result<String, GraphError> {
        let listen_to = self.bridge(index)?.property::<Option<String>>("listen-to");
        Ok(listen_to.unwrap_or_default())
    }

    fn set_routing(&self, index: usize, identifier: &str) -> Result<(), GraphError> {
        let source = self
            .sources
            .get(index)
            .ok_or(GraphError::UnknownSource { index })?;
        if !source.owns(identifier) {
            return Err(GraphError::InvalidRoute {
                index,
                identifier: identifier.to_string(),
            });
        }
        self.bridge(index)?.set_property("listen-to", identifier);
        debug!(source = index, route = identifier, "listen-to updated");
        Ok(())
    }

    fn restart_source_pipeline(&self, index: usize) -> Result<(), GraphError> {
        let pipeline = self.pipeline(PipelineRef::Source(index))?.clone();
        let Some(permit) = self.restarts.claim(index) else {
            debug!(source = index, "restart not issued: pending or closed");
            return Ok(());
        };
        // state changes on a stalled rtsp session can block for seconds
        tokio::task::spawn_blocking(move || {
            permit.run(|| {
                if pipeline.set_state(gst::State::Null).is_err() {
                    warn!(source = index, "restart: pipeline refused to stop");
                }
                if pipeline.set_state(gst::State::Playing).is_err() {
                    warn!(source = index, "restart: pipeline refused to start");
                }
            })
        });
        Ok(())
    }

    fn stop_pipeline(&self, pipeline: PipelineRef) -> Result<(), GraphError> {
        let _serial = match pipeline {
            PipelineRef::Source(index) => self.restarts.hold(index),
            _ => None,
        };
        self.set_state(pipeline, gst::State::Null)
    }

    fn start_pipeline(&self, pipeline: PipelineRef) -> Result<(), GraphError> {
        self.set_state(pipeline, gst::State::Playing)
    }

    fn send_end_of_stream(&self, pipeline: PipelineRef) -> Result<(), GraphError> {
        if !self.pipeline(pipeline)?.send_event(gst::event::Eos::new()) {
            debug!(%pipeline, "end-of-stream not handled");
        }
        Ok(())
    }

    fn reinitialize_aggregate(&self) -> Result<(), GraphError> {
        self.set_state(PipelineRef::Aggregate, gst::State::Null)?;
        self.set_state(PipelineRef::Aggregate, gst::State::Playing)
    }

    fn close(&self) {
        self.restarts.close();
        debug!("source restarts fenced");
    }
}
