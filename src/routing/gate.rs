//! Coalescing and shutdown fencing for background source restarts.
//!
//! A restart runs off the caller's thread and may block for seconds on a
//! dead session. [`RestartGate`] keeps at most one restart pending per source
//! and lets teardown close the gate so nothing restarted later can bring a
//! stopped pipeline back.
//!
//! ```text
//! claim(i) ──► Some(permit) ──► permit.run(|| stop + start)   (under slot i lock)
//!          └─► None            (closed, unknown index, or one already pending)
//!
//! close() ──► hold(i) ──► stop(Source i)   waits for an in-flight run, later runs are skipped
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio_util::sync::CancellationToken;
use tracing::trace;

struct Slot {
    pending: AtomicBool,
    serial: Mutex<()>,
}

/// Per-source restart admission shared by a graph service and its restart workers.
pub struct RestartGate {
    closed: CancellationToken,
    slots: Vec<Slot>,
}

impl RestartGate {
    /// Creates an open gate for `sources` sources.
    pub fn new(sources: usize) -> Self {
        let slots = (0..sources)
            .map(|_| Slot {
                pending: AtomicBool::new(false),
                serial: Mutex::new(()),
            })
            .collect();
        Self {
            closed: CancellationToken::new(),
            slots,
        }
    }

    /// Refuses every later claim and every permit that has not started running.
    pub fn close(&self) {
        self.closed.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// True while a restart of `index` is claimed and not yet finished.
    pub fn is_pending(&self, index: usize) -> bool {
        self.slots
            .get(index)
            .is_some_and(|slot| slot.pending.load(Ordering::Acquire))
    }

    /// Claims the restart slot of `index`.
    ///
    /// Returns `None` when the gate is closed, the index is unknown, or a
    /// restart of that source is still pending.
    pub fn claim(self: &Arc<Self>, index: usize) -> Option<RestartPermit> {
        if self.is_closed() {
            trace!(source = index, "restart refused: gate closed");
            return None;
        }
        let slot = self.slots.get(index)?;
        if slot.pending.swap(true, Ordering::AcqRel) {
            trace!(source = index, "restart coalesced with pending one");
            return None;
        }
        Some(RestartPermit {
            gate: Arc::clone(self),
            index,
        })
    }

    /// Waits for an in-flight restart of `index` and blocks new ones while held.
    pub fn hold(&self, index: usize) -> Option<MutexGuard<'_, ()>> {
        self.slots.get(index).map(|slot| lock(&slot.serial))
    }
}

/// Right to run one restart of a source. Releases the slot when dropped.
pub struct RestartPermit {
    gate: Arc<RestartGate>,
    index: usize,
}

impl RestartPermit {
    pub fn index(&self) -> usize {
        self.index
    }

    /// Runs `restart` under the source's lock unless the gate closed first.
    ///
    /// Returns whether `restart` ran.
    pub fn run<F: FnOnce()>(self, restart: F) -> bool {
        let slot = &self.gate.slots[self.index];
        let _serial = lock(&slot.serial);
        if self.gate.is_closed() {
            trace!(source = self.index, "restart skipped: gate closed");
            return false;
        }
        restart();
        true
    }
}

impl Drop for RestartPermit {
    fn drop(&mut self) {
        if let Some(slot) = self.gate.slots.get(self.index) {
            slot.pending.store(false, Ordering::Release);
        }
    }
}

fn lock(m: &Mutex<()>) -> MutexGuard<'_, ()> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn second_claim_is_coalesced_until_the_first_finishes() {
        let gate = Arc::new(RestartGate::new(2));
        let first = gate.claim(0).unwrap();
        assert!(gate.is_pending(0));
        assert!(gate.claim(0).is_none());
        assert!(gate.claim(1).is_some());

        assert!(first.run(|| {}));
        assert!(!gate.is_pending(0));
        assert!(gate.claim(0).is_some());
    }

    #[test]
    fn closed_gate_refuses_claims_and_skips_issued_permits() {
        let gate = Arc::new(RestartGate::new(1));
        let issued = gate.claim(0).unwrap();
        gate.close();

        assert!(gate.claim(0).is_none());
        let ran = AtomicUsize::new(0);
        assert!(!issued.run(|| {
            ran.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert!(!gate.is_pending(0));
    }

    #[test]
    fn unknown_index_is_never_claimed() {
        let gate = Arc::new(RestartGate::new(1));
        assert!(gate.claim(3).is_none());
        assert!(gate.hold(3).is_none());
    }

    #[test]
    fn hold_waits_for_a_running_restart() {
        let gate = Arc::new(RestartGate::new(1));
        let permit = gate.claim(0).unwrap();
        let order = Arc::new(Mutex::new(Vec::new()));

        let (started_tx, started_rx) = std::sync::mpsc::channel();
        let worker = {
            let order = Arc::clone(&order);
            std::thread::spawn(move || {
                permit.run(|| {
                    started_tx.send(()).unwrap();
                    std::thread::sleep(std::time::Duration::from_millis(50));
                    order.lock().unwrap().push("restart");
                })
            })
        };

        started_rx.recv().unwrap();
        gate.close();
        {
            let _held = gate.hold(0).unwrap();
            order.lock().unwrap().push("stop");
        }
        assert!(worker.join().unwrap());
        assert_eq!(*order.lock().unwrap(), vec!["restart", "stop"]);
    }
}
