use std::time::Duration;

use crate::sources::Mode;

/// What one tick does to one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// No routing change, no recovery action.
    Stay,
    /// Fallback source is fresh again: route back to live.
    SwitchToLive,
    /// Live source went stale: route to fallback.
    SwitchToFallback,
    /// Fallback source is still stale: restart its pipeline, stay on fallback.
    Restart,
}

impl Decision {
    /// Mode the source is in after the decision is applied.
    pub fn next_mode(self, current: Mode) -> Mode {
        match self {
            Decision::Stay | Decision::Restart => current,
            Decision::SwitchToLive => Mode::Live,
            Decision::SwitchToFallback => Mode::Fallback,
        }
    }
}

/// Returns `true` if a buffer age exceeds `threshold`. `None` (never observed) is stale.
///
/// An age equal to the threshold is still fresh.
#[inline]
pub fn is_stale(age: Option<Duration>, threshold: Duration) -> bool {
    age.is_none_or(|a| a > threshold)
}

/// Pure failover table.
///
/// ```text
///              age <= threshold     age > threshold
/// FALLBACK     SwitchToLive         Restart
/// LIVE         Stay                 SwitchToFallback
/// ```
pub fn decide(mode: Mode, age: Option<Duration>, threshold: Duration) -> Decision {
    match (mode, is_stale(age, threshold)) {
        (Mode::Fallback, false) => Decision::SwitchToLive,
        (Mode::Fallback, true) => Decision::Restart,
        (Mode::Live, false) => Decision::Stay,
        (Mode::Live, true) => Decision::SwitchToFallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THETA: Duration = Duration::from_secs(10);

    fn secs(s: u64) -> Option<Duration> {
        Some(Duration::from_secs(s))
    }

    #[test]
    fn table() {
        assert_eq!(decide(Mode::Live, secs(3), THETA), Decision::Stay);
        assert_eq!(decide(Mode::Live, secs(11), THETA), Decision::SwitchToFallback);
        assert_eq!(decide(Mode::Fallback, secs(3), THETA), Decision::SwitchToLive);
        assert_eq!(decide(Mode::Fallback, secs(11), THETA), Decision::Restart);
    }

    #[test]
    fn threshold_tie_is_fresh() {
        assert_eq!(decide(Mode::Live, secs(10), THETA), Decision::Stay);
        assert_eq!(decide(Mode::Fallback, secs(10), THETA), Decision::SwitchToLive);
    }

    #[test]
    fn never_observed_is_stale() {
        assert_eq!(decide(Mode::Live, None, THETA), Decision::SwitchToFallback);
        assert_eq!(decide(Mode::Fallback, None, THETA), Decision::Restart);
    }

    #[test]
    fn next_mode_follows_decision() {
        assert_eq!(Decision::Restart.next_mode(Mode::Fallback), Mode::Fallback);
        assert_eq!(Decision::SwitchToLive.next_mode(Mode::Fallback), Mode::Live);
        assert_eq!(Decision::SwitchToFallback.next_mode(Mode::Live), Mode::Fallback);
        assert_eq!(Decision::Stay.next_mode(Mode::Live), Mode::Live);
    }
}
