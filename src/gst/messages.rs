//! Bus message conversion and forwarding.
//!
//! Every pipeline gets one pump thread that pops messages from its bus,
//! turns them into [`HealthEvent`]s and hands them to the run loop.

use std::thread::JoinHandle;
use std::time::Duration;

use gstreamer as gst;
use gstreamer::glib;
use gstreamer::prelude::*;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::error::GraphError;
use crate::health::{ErrorDomain, HealthEvent, HealthKind, Origin, Scope, StatusKind};

/// How long a pump waits on an idle bus before checking whether the run loop is gone.
const POP_TIMEOUT: Duration = Duration::from_millis(250);

/// Element factories with a dedicated [`Origin`].
const WATCHDOG_FACTORY: &str = "watchdog";
const BRIDGE_FACTORY: &str = "interpipesrc";

/// Spawns a thread forwarding `pipeline`'s bus messages as health events.
///
/// The thread exits once the receiving side of `tx` is dropped.
pub(crate) fn spawn_pump(
    pipeline: &gst::Pipeline,
    scope: Scope,
    tx: mpsc::Sender<HealthEvent>,
) -> Result<JoinHandle<()>, GraphError> {
    let bus = pipeline.bus().ok_or_else(|| GraphError::Init {
        reason: format!("{scope} pipeline has no bus"),
    })?;
    let timeout = gst::ClockTime::from_mseconds(POP_TIMEOUT.as_millis() as u64);

    std::thread::Builder::new()
        .name(format!("bus-{scope}"))
        .spawn(move || {
            while !tx.is_closed() {
                let Some(msg) = bus.timed_pop(timeout) else {
                    continue;
                };
                let ev = convert(&msg, scope);
                trace!(%scope, kind = ?ev.kind, origin = %ev.origin, "bus message");
                if tx.blocking_send(ev).is_err() {
                    break;
                }
            }
            debug!(%scope, "bus pump stopped");
        })
        .map_err(GraphError::Io)
}

/// Maps one bus message onto the closed health-event model.
pub(crate) fn convert(msg: &gst::Message, scope: Scope) -> HealthEvent {
    use gst::MessageView;

    let (kind, error) = match msg.view() {
        MessageView::Eos(_) => (HealthKind::Eos, None),
        MessageView::Error(e) => (HealthKind::Error, Some((e.error(), e.debug()))),
        MessageView::Warning(w) => (HealthKind::Warning, Some((w.error(), w.debug()))),
        MessageView::StateChanged(_) => (HealthKind::Status(StatusKind::StateChanged), None),
        MessageView::StreamStatus(_) => (HealthKind::Status(StatusKind::StreamStatus), None),
        MessageView::Element(_) => (HealthKind::Status(StatusKind::Element), None),
        MessageView::Tag(_) => (HealthKind::Status(StatusKind::Tag), None),
        MessageView::DurationChanged(_) => (HealthKind::Status(StatusKind::DurationChanged), None),
        MessageView::AsyncDone(_) => (HealthKind::Status(StatusKind::AsyncDone), None),
        MessageView::NewClock(_) => (HealthKind::Status(StatusKind::NewClock), None),
        MessageView::Progress(_) => (HealthKind::Status(StatusKind::Progress), None),
        MessageView::Buffering(_) => (HealthKind::Status(StatusKind::Buffering), None),
        MessageView::Qos(_) => (HealthKind::Status(StatusKind::Qos), None),
        MessageView::Latency(_) => (HealthKind::Status(StatusKind::Latency), None),
        MessageView::StreamStart(_) => (HealthKind::Status(StatusKind::StreamStart), None),
        _ => (HealthKind::Unrecognized(format!("{:?}", msg.type_())), None),
    };

    let mut ev = HealthEvent::new(kind, scope).with_origin(origin_of(msg));
    if let Some((err, debug)) = error {
        ev = ev.with_domain(domain_of(&err)).with_message(err.message());
        if let Some(debug) = debug {
            ev = ev.with_detail(debug.as_str());
        }
    }
    ev
}

fn origin_of(msg: &gst::Message) -> Origin {
    let Some(src) = msg.src() else {
        return Origin::Pipeline;
    };
    if src.is::<gst::Pipeline>() {
        return Origin::Pipeline;
    }
    let name = src.name().to_string();
    let factory = src
        .downcast_ref::<gst::Element>()
        .and_then(|el| el.factory())
        .map(|f| f.name().to_string());

    match factory.as_deref() {
        Some(WATCHDOG_FACTORY) => Origin::Watchdog,
        Some(BRIDGE_FACTORY) => Origin::Bridge(name),
        _ => Origin::Element(name),
    }
}

fn domain_of(err: &glib::Error) -> ErrorDomain {
    if err.is::<gst::CoreError>() {
        ErrorDomain::Core
    } else if err.is::<gst::LibraryError>() {
        ErrorDomain::Library
    } else if err.is::<gst::ResourceError>() {
        ErrorDomain::Resource
    } else if err.is::<gst::StreamError>() {
        ErrorDomain::Stream
    } else {
        ErrorDomain::Other(err.domain().as_str().to_string())
    }
}
