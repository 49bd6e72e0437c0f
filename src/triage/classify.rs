use crate::config::Config;
use crate::health::{HealthEvent, HealthKind, Origin, Scope};

use super::action::{Action, FatalFault, Notice};

/// Message text the media framework uses for generic streaming failures.
const INTERNAL_STREAM_ERROR: &str = "Internal data stream error";

/// Health event classifier.
///
/// Holds the two pattern lists that cannot be expressed structurally:
/// benign warning details and quiet element-name prefixes.
///
/// ## Example
/// ```rust
/// use feedvisor::{Action, HealthEvent, HealthKind, Scope, Triage};
///
/// let triage = Triage::default();
/// let eos = HealthEvent::new(HealthKind::Eos, Scope::Aggregate);
/// assert_eq!(triage.classify(&eos), Action::EndOfStream);
/// ```
#[derive(Debug, Clone)]
pub struct Triage {
    benign_warnings: Vec<String>,
    quiet_origins: Vec<String>,
}

impl Default for Triage {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl Triage {
    /// Creates a classifier with explicit pattern lists.
    pub fn new(benign_warnings: Vec<String>, quiet_origins: Vec<String>) -> Self {
        Self {
            benign_warnings,
            quiet_origins,
        }
    }

    /// Creates a classifier from the runtime configuration.
    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.benign_warnings.clone(), cfg.quiet_origins.clone())
    }

    /// Maps one event to exactly one action.
    pub fn classify(&self, ev: &HealthEvent) -> Action {
        match &ev.kind {
            HealthKind::Eos => Action::EndOfStream,
            HealthKind::Warning => self.classify_warning(ev),
            HealthKind::Error => classify_error(ev),
            HealthKind::Status(_) => Action::Ignore,
            HealthKind::Unrecognized(kind) => {
                if self.is_quiet(&ev.origin) {
                    Action::Ignore
                } else {
                    Action::Log(Notice::Unrecognized {
                        scope: ev.scope,
                        origin: ev.origin.to_string(),
                        kind: kind.clone(),
                    })
                }
            }
        }
    }

    fn classify_warning(&self, ev: &HealthEvent) -> Action {
        if self.is_benign(&ev.detail) {
            return Action::Ignore;
        }
        Action::Log(Notice::Warning {
            scope: ev.scope,
            origin: ev.origin.to_string(),
            message: ev.message.clone(),
            detail: ev.detail.clone(),
        })
    }

    fn is_benign(&self, detail: &str) -> bool {
        self.benign_warnings
            .iter()
            .any(|p| !p.is_empty() && detail.contains(p.as_str()))
    }

    fn is_quiet(&self, origin: &Origin) -> bool {
        origin.name().is_some_and(|name| {
            self.quiet_origins
                .iter()
                .any(|p| !p.is_empty() && name.starts_with(p.as_str()))
        })
    }
}

fn classify_error(ev: &HealthEvent) -> Action {
    match ev.scope {
        Scope::Aggregate => match &ev.origin {
            Origin::Watchdog => Action::RestartAggregate,
            Origin::Bridge(name) => Action::Fatal(FatalFault::Bridge {
                origin: name.clone(),
                internal_stream: ev.message.contains(INTERNAL_STREAM_ERROR),
                message: ev.message.clone(),
                detail: ev.detail.clone(),
            }),
            other => Action::Fatal(FatalFault::Aggregate {
                origin: other.to_string(),
                message: ev.message.clone(),
                detail: ev.detail.clone(),
            }),
        },
        Scope::Source(index) => match &ev.domain {
            Some(domain) if domain.is_isolatable() => Action::Isolate { source: index },
            domain => Action::Fatal(FatalFault::Source {
                index,
                domain: domain.clone(),
                message: ev.message.clone(),
                detail: ev.detail.clone(),
            }),
        },
        Scope::Fallback => Action::Fatal(FatalFault::Fallback {
            message: ev.message.clone(),
            detail: ev.detail.clone(),
        }),
    }
}
