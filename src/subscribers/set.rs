//! # Per-subscriber delivery of runtime events.
//!
//! [`SubscriberSet`] gives every [`Subscribe`] implementation its own bounded
//! queue and worker task, so a slow log sink never delays the fallback tracker
//! and neither ever delays the run loop.
//!
//! ```text
//! emit(&Event) ──► Arc<Event> ──┬─► Queue(log-writer) ──► worker ──► on_event
//!                               ├─► Queue(fallback-tracker) ──► worker ──► on_event
//!                               └─► Queue(custom) ──► worker ──► on_event
//!                                      │ full/closed             │ panic
//!                                      ▼                         ▼
//!                              SubscriberOverflow on Bus   SubscriberPanicked on Bus
//! ```
//!
//! ## Rules
//! - `emit` never waits: a full queue drops the event for that subscriber only
//! - Each subscriber sees its events in publish order; there is no order across subscribers
//! - A panicking `on_event` is caught and the worker keeps going

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::warn;

use crate::events::{Bus, Event, EventKind};
use crate::subscribers::Subscribe;

/// Sending half of one subscriber's queue.
struct Queue {
    name: &'static str,
    tx: mpsc::Sender<Arc<Event>>,
}

impl Queue {
    /// Hands `ev` to the worker; returns why it was dropped, if it was.
    fn offer(&self, ev: &Arc<Event>) -> Option<&'static str> {
        match self.tx.try_send(Arc::clone(ev)) {
            Ok(()) => None,
            Err(TrySendError::Full(_)) => Some("full"),
            Err(TrySendError::Closed(_)) => Some("closed"),
        }
    }
}

/// Fan-out coordinator for multiple event subscribers.
pub struct SubscriberSet {
    queues: Vec<Queue>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker task per subscriber.
    ///
    /// Must be called from inside a tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let (queues, workers): (Vec<_>, Vec<_>) = subs
            .into_iter()
            .map(|sub| spawn_worker(sub, bus.clone()))
            .unzip();
        Self {
            queues,
            workers,
            bus,
        }
    }

    /// Emits an event to all subscribers (non-blocking).
    ///
    /// A dropped `SubscriberOverflow` is only logged, never re-published.
    pub fn emit(&self, event: &Event) {
        let shared = Arc::new(event.clone());
        for queue in &self.queues {
            let Some(reason) = queue.offer(&shared) else {
                continue;
            };
            warn!(subscriber = queue.name, reason, kind = ?event.kind, "subscriber dropped event");
            if event.kind != EventKind::SubscriberOverflow {
                self.bus.publish(Event::subscriber_overflow(queue.name, reason));
            }
        }
    }

    /// Closes every queue and waits for the workers to drain them.
    pub async fn shutdown(self) {
        let Self { queues, workers, .. } = self;
        drop(queues);
        for worker in workers {
            let _ = worker.await;
        }
    }

    /// True if there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queues.len()
    }
}

/// Runs `sub` on its own task until its queue is closed. A panic in
/// `on_event` is reported and the worker moves on to the next event.
fn spawn_worker(sub: Arc<dyn Subscribe>, bus: Bus) -> (Queue, JoinHandle<()>) {
    let name = sub.name();
    let (tx, mut rx) = mpsc::channel::<Arc<Event>>(sub.queue_capacity().max(1));
    let worker = tokio::spawn(async move {
        while let Some(ev) = rx.recv().await {
            let delivery = AssertUnwindSafe(sub.on_event(&ev)).catch_unwind().await;
            if let Err(payload) = delivery {
                let info = panic_message(payload.as_ref());
                warn!(subscriber = name, %info, "subscriber panicked");
                bus.publish(Event::subscriber_panicked(name, info));
            }
        }
    });
    (Queue { name, tx }, worker)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&'static str>()
        .map(|msg| (*msg).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
