//! # Health events raised by pipeline collaborators.
//!
//! A [`HealthEvent`] is an immutable notification (end-of-stream, warning,
//! error, status) produced by one of the pipelines and consumed exactly once
//! by [`Triage`](crate::Triage). Every field that triage branches on is a
//! closed enum; free text is kept only for logs and benign-warning matching.

mod event;

pub use event::{ErrorDomain, HealthEvent, HealthKind, Origin, Scope, StatusKind};
