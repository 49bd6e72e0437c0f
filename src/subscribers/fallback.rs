//! # Fallback set tracker with sequence-based ordering.
//!
//! Maintains which sources are currently routed to their fallback feed, using
//! event sequence numbers to handle out-of-order delivery.
//!
//! ## Architecture
//! ```text
//! FailoverEngine ──► Bus ──► subscriber_listener() ──► SubscriberSet ──► FallbackTracker
//!                                                                            │
//!                                                                            ▼
//!                                                          HashMap<usize, SourceState>
//!                                                          (index → {last_seq, on_fallback})
//! ```
//!
//! ## Rules
//! - `FallbackActivated` marks a source as on fallback
//! - `LiveRestored` clears it
//! - `RoutingRepaired` follows the repaired route (`fallback_*` marks, anything else clears)
//! - Events with `seq <= last_seq` for that source are **rejected** (stale)

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

#[derive(Debug, Clone, Copy)]
struct SourceState {
    last_seq: u64,
    on_fallback: bool,
}

/// Tracks the set of sources currently routed to their fallback feed.
#[derive(Debug, Default)]
pub struct FallbackTracker {
    state: RwLock<HashMap<usize, SourceState>>,
}

impl FallbackTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one event. Returns `false` if it was stale or irrelevant.
    pub async fn update(&self, ev: &Event) -> bool {
        let Some(index) = ev.source else {
            return false;
        };
        let on_fallback = match ev.kind {
            EventKind::FallbackActivated => true,
            EventKind::LiveRestored => false,
            EventKind::RoutingRepaired => ev
                .route
                .as_deref()
                .is_some_and(|r| r.starts_with("fallback_")),
            _ => return false,
        };

        let mut g = self.state.write().await;
        if let Some(prev) = g.get(&index) {
            if ev.seq <= prev.last_seq {
                debug!(source = index, seq = ev.seq, last_seq = prev.last_seq, "stale routing event");
                return false;
            }
        }
        g.insert(
            index,
            SourceState {
                last_seq: ev.seq,
                on_fallback,
            },
        );
        true
    }

    /// Sorted indices of sources currently on fallback.
    pub async fn snapshot(&self) -> Vec<usize> {
        let g = self.state.read().await;
        let mut v: Vec<usize> = g
            .iter()
            .filter(|(_, s)| s.on_fallback)
            .map(|(i, _)| *i)
            .collect();
        v.sort_unstable();
        v
    }

    pub async fn is_on_fallback(&self, index: usize) -> bool {
        self.state
            .read()
            .await
            .get(&index)
            .is_some_and(|s| s.on_fallback)
    }
}

#[async_trait]
impl Subscribe for FallbackTracker {
    async fn on_event(&self, ev: &Event) {
        self.update(ev).await;
    }

    fn name(&self) -> &'static str {
        "fallback-tracker"
    }
}
