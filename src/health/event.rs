use std::fmt;

/// Informational status notifications. None of them trigger an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    StateChanged,
    StreamStatus,
    Element,
    Tag,
    DurationChanged,
    AsyncDone,
    NewClock,
    Progress,
    Buffering,
    Qos,
    Latency,
    StreamStart,
}

/// Classification of a health event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthKind {
    /// End of stream.
    Eos,
    /// Non-fatal warning.
    Warning,
    /// Error.
    Error,
    /// Recognized informational notification.
    Status(StatusKind),
    /// Anything else; carries the collaborator's name for the message type.
    Unrecognized(String),
}

/// Which pipeline raised the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Aggregate,
    Source(usize),
    Fallback,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Aggregate => f.write_str("aggregate"),
            Scope::Source(i) => write!(f, "source-{i}"),
            Scope::Fallback => f.write_str("fallback"),
        }
    }
}

/// Which element inside the pipeline raised the event.
///
/// The collaborator maps the element factories it knows about; everything
/// else is carried by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// The aggregate's stall watchdog.
    Watchdog,
    /// An inter-pipeline bridge endpoint reading a routed feed.
    Bridge(String),
    /// Any other element.
    Element(String),
    /// The pipeline itself or an unnamed object.
    Pipeline,
}

impl Origin {
    /// Element name, if any.
    pub fn name(&self) -> Option<&str> {
        match self {
            Origin::Bridge(n) | Origin::Element(n) => Some(n),
            Origin::Watchdog | Origin::Pipeline => None,
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Watchdog => f.write_str("watchdog"),
            Origin::Bridge(n) => write!(f, "bridge:{n}"),
            Origin::Element(n) => f.write_str(n),
            Origin::Pipeline => f.write_str("pipeline"),
        }
    }
}

/// Error domain of an `Error`/`Warning` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorDomain {
    Core,
    Library,
    Resource,
    Stream,
    Other(String),
}

impl ErrorDomain {
    /// True for the domains a single source can recover from by being isolated.
    pub fn is_isolatable(&self) -> bool {
        matches!(self, ErrorDomain::Stream | ErrorDomain::Resource)
    }
}

impl fmt::Display for ErrorDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorDomain::Core => f.write_str("core"),
            ErrorDomain::Library => f.write_str("library"),
            ErrorDomain::Resource => f.write_str("resource"),
            ErrorDomain::Stream => f.write_str("stream"),
            ErrorDomain::Other(d) => f.write_str(d),
        }
    }
}

/// Immutable notification from a pipeline collaborator.
///
/// ## Example
/// ```rust
/// use feedvisor::{ErrorDomain, HealthEvent, HealthKind, Origin, Scope};
///
/// let ev = HealthEvent::new(HealthKind::Error, Scope::Source(0))
///     .with_origin(Origin::Element("rtspsrc0".into()))
///     .with_domain(ErrorDomain::Resource)
///     .with_message("Could not open resource for reading.");
///
/// assert_eq!(ev.scope, Scope::Source(0));
/// assert_eq!(ev.domain, Some(ErrorDomain::Resource));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthEvent {
    /// Event classification.
    pub kind: HealthKind,
    /// Pipeline that raised it.
    pub scope: Scope,
    /// Element that raised it.
    pub origin: Origin,
    /// Error domain (errors and warnings only).
    pub domain: Option<ErrorDomain>,
    /// Short human-readable message.
    pub message: String,
    /// Debug detail.
    pub detail: String,
}

impl HealthEvent {
    /// Creates an event raised by the pipeline itself with no payload.
    pub fn new(kind: HealthKind, scope: Scope) -> Self {
        Self {
            kind,
            scope,
            origin: Origin::Pipeline,
            domain: None,
            message: String::new(),
            detail: String::new(),
        }
    }

    /// Sets the originating element.
    #[inline]
    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    /// Sets the error domain.
    #[inline]
    pub fn with_domain(mut self, domain: ErrorDomain) -> Self {
        self.domain = Some(domain);
        self
    }

    /// Sets the message.
    #[inline]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Sets the debug detail.
    #[inline]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }
}
