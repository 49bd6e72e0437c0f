use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::Instant;

/// Slot value meaning "no buffer observed yet".
const NEVER: u64 = 0;

/// Lock-free table of last-buffer timestamps, one slot per source.
///
/// Timestamps are stored as nanoseconds since the tracker's origin, offset by
/// one so that `0` can act as the never-observed sentinel.
///
/// ### Rules
/// - `record` is O(1), wait-free for distinct indices
/// - Out-of-range indices are ignored on write and read as never observed
/// - Timestamps earlier than the origin clamp to the origin
#[derive(Debug)]
pub struct LivenessTracker {
    origin: Instant,
    slots: Box<[AtomicU64]>,
}

impl LivenessTracker {
    /// Creates a tracker for `sources` sources, none observed yet.
    pub fn new(sources: usize) -> Self {
        Self::with_origin(sources, Instant::now())
    }

    /// Creates a tracker whose timestamps are measured from `origin`.
    pub fn with_origin(sources: usize, origin: Instant) -> Self {
        let slots = (0..sources).map(|_| AtomicU64::new(NEVER)).collect();
        Self { origin, slots }
    }

    /// Records a buffer arrival for `index` at `at`.
    ///
    /// Never moves a slot backwards: a late, older timestamp is dropped.
    pub fn record(&self, index: usize, at: Instant) {
        let Some(slot) = self.slots.get(index) else {
            return;
        };
        let nanos = at.saturating_duration_since(self.origin).as_nanos();
        let encoded = u64::try_from(nanos).unwrap_or(u64::MAX - 1) + 1;
        slot.fetch_max(encoded, Ordering::Relaxed);
    }

    /// Records a buffer arrival for `index` now. Ingestion probe entry point.
    #[inline]
    pub fn touch(&self, index: usize) {
        self.record(index, Instant::now());
    }

    /// Returns the most recent arrival for `index`, or `None` if never observed.
    pub fn read(&self, index: usize) -> Option<Instant> {
        let encoded = self.slots.get(index)?.load(Ordering::Relaxed);
        if encoded == NEVER {
            return None;
        }
        Some(self.origin + Duration::from_nanos(encoded - 1))
    }

    /// Age of the last arrival at `now`; `None` means infinitely old.
    pub fn age(&self, index: usize, now: Instant) -> Option<Duration> {
        self.read(index)
            .map(|last| now.saturating_duration_since(last))
    }

    /// True if the age of `index` at `now` is strictly greater than `threshold`.
    pub fn is_stale(&self, index: usize, now: Instant, threshold: Duration) -> bool {
        match self.age(index, now) {
            Some(age) => age > threshold,
            None => true,
        }
    }

    /// Number of tracked sources.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True if no sources are tracked.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
