//! Error types used by the feedvisor runtime and its pipeline collaborators.
//!
//! This module defines two main error enums:
//!
//! - [`RuntimeError`]: outcomes that end the run loop with a failure.
//! - [`GraphError`]: failures reported by a [`RoutingControl`](crate::RoutingControl)
//!   implementation (construction, linking, state changes, routing).
//!
//! Both types provide a stable `as_label` for logs/metrics.

use thiserror::Error;

use crate::routing::PipelineRef;
use crate::triage::FatalFault;

/// # Errors produced by the feedvisor runtime.
///
/// Transient source stalls never show up here: they are handled by the
/// failover engine. Only faults that end the run loop are surfaced.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// A health event was classified as fatal; teardown has already run.
    #[error("fatal pipeline fault: {fault}")]
    Fatal {
        /// The classified fault.
        fault: FatalFault,
    },

    /// A pipeline could not be started during start-up; teardown has already run.
    #[error("start-up failed: {source}")]
    Startup {
        /// The collaborator error.
        #[source]
        source: GraphError,
    },

    /// The configuration cannot drive a run (e.g. a zero health-check period).
    #[error("invalid configuration: {reason}")]
    Config {
        /// What is wrong.
        reason: String,
    },

    /// OS signal listeners could not be registered.
    #[error("signal registration failed: {source}")]
    Signal {
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use feedvisor::{GraphError, PipelineRef, RuntimeError};
    ///
    /// let err = RuntimeError::Startup {
    ///     source: GraphError::StateChange { pipeline: PipelineRef::Aggregate },
    /// };
    /// assert_eq!(err.as_label(), "runtime_startup");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::Fatal { .. } => "runtime_fatal",
            RuntimeError::Startup { .. } => "runtime_startup",
            RuntimeError::Config { .. } => "runtime_config",
            RuntimeError::Signal { .. } => "runtime_signal",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::Fatal { fault } => format!("fatal: {fault}"),
            RuntimeError::Startup { source } => format!("startup: {source}"),
            RuntimeError::Config { reason } => format!("config: {reason}"),
            RuntimeError::Signal { source } => format!("signal: {source}"),
        }
    }
}

/// # Errors produced by the pipeline graph service.
///
/// Construction failures are reported before any linking continues, so a
/// half-built graph is never handed to the runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum GraphError {
    /// The media framework could not be initialised.
    #[error("media framework init failed: {reason}")]
    Init {
        /// Underlying reason.
        reason: String,
    },

    /// An element could not be created (missing plugin or bad property).
    #[error("cannot create element `{factory}` ({name}): {reason}")]
    ElementCreation {
        /// Factory name, e.g. `interpipesrc`.
        factory: String,
        /// Requested element name.
        name: String,
        /// Underlying reason.
        reason: String,
    },

    /// Elements could not be added or linked.
    #[error("cannot link {what}: {reason}")]
    Link {
        /// Human-readable description of the link.
        what: String,
        /// Underlying reason.
        reason: String,
    },

    /// A pipeline refused a state change.
    #[error("state change failed on {pipeline}")]
    StateChange {
        /// Pipeline that refused.
        pipeline: PipelineRef,
    },

    /// The source index has no pipeline.
    #[error("unknown source index {index}")]
    UnknownSource {
        /// The offending index.
        index: usize,
    },

    /// An identifier that belongs to neither feed of the source was requested.
    #[error("identifier `{identifier}` is not a feed of source {index}")]
    InvalidRoute {
        /// Source index.
        index: usize,
        /// Rejected identifier.
        identifier: String,
    },

    /// Filesystem failure (e.g. creating an output directory).
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl GraphError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            GraphError::Init { .. } => "graph_init",
            GraphError::ElementCreation { .. } => "graph_element_creation",
            GraphError::Link { .. } => "graph_link",
            GraphError::StateChange { .. } => "graph_state_change",
            GraphError::UnknownSource { .. } => "graph_unknown_source",
            GraphError::InvalidRoute { .. } => "graph_invalid_route",
            GraphError::Io(_) => "graph_io",
        }
    }
}
