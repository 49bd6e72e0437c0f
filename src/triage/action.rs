use std::fmt;

use crate::health::{ErrorDomain, Scope};

/// What the run loop does with one health event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Nothing to do.
    Ignore,
    /// Log for diagnostics; no state change.
    Log(Notice),
    /// Stop only this source's pipeline; everything else keeps running.
    Isolate { source: usize },
    /// Stop the aggregate, push end-of-stream, reinitialize; keep running.
    RestartAggregate,
    /// Graceful end of the run loop.
    EndOfStream,
    /// Unrecoverable; end the run loop with an error.
    Fatal(FatalFault),
}

impl Action {
    /// True if the action ends the run loop.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Action::EndOfStream | Action::Fatal(_))
    }

    /// Short stable label (snake_case) for logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            Action::Ignore => "ignore",
            Action::Log(_) => "log",
            Action::Isolate { .. } => "isolate",
            Action::RestartAggregate => "restart_aggregate",
            Action::EndOfStream => "end_of_stream",
            Action::Fatal(_) => "fatal",
        }
    }
}

/// Diagnostics-only outcomes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A non-benign warning.
    Warning {
        scope: Scope,
        origin: String,
        message: String,
        detail: String,
    },
    /// A message type triage does not know.
    Unrecognized {
        scope: Scope,
        origin: String,
        kind: String,
    },
}

/// Faults that end the run loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FatalFault {
    /// Error on a source outside the isolatable domains.
    Source {
        index: usize,
        domain: Option<ErrorDomain>,
        message: String,
        detail: String,
    },
    /// Error on an aggregate bridge endpoint.
    Bridge {
        origin: String,
        /// "Internal data stream error" sub-case.
        internal_stream: bool,
        message: String,
        detail: String,
    },
    /// Any other aggregate error.
    Aggregate {
        origin: String,
        message: String,
        detail: String,
    },
    /// Error in the synthetic feed generator.
    Fallback { message: String, detail: String },
}

impl fmt::Display for FatalFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FatalFault::Source {
                index,
                domain,
                message,
                detail,
            } => {
                let domain = domain
                    .as_ref()
                    .map_or_else(|| "unknown".to_string(), ToString::to_string);
                write!(f, "source-{index} {domain} error: {message} ({detail})")
            }
            FatalFault::Bridge {
                origin,
                internal_stream: true,
                ..
            } => write!(f, "internal data stream error in {origin}"),
            FatalFault::Bridge {
                origin,
                message,
                detail,
                ..
            } => write!(f, "bridge {origin} error: {message} ({detail})"),
            FatalFault::Aggregate {
                origin,
                message,
                detail,
            } => write!(f, "aggregate {origin} error: {message} ({detail})"),
            FatalFault::Fallback { message, detail } => {
                write!(f, "fallback generator error: {message} ({detail})")
            }
        }
    }
}
