//! # Global runtime configuration.
//!
//! Provides [`Config`] centralized settings for the failover runtime.
//!
//! Config is used in three places:
//! 1. **Supervisor creation**: `Supervisor::builder(config)`
//! 2. **Failover engine**: unhealthy threshold Θ
//! 3. **Pipeline graph service**: output directory, caps, watchdog timeout
//!
//! ## Sentinel values
//! - `period = 0s` → health-check period derived as `threshold / 4`
//! - `watchdog_timeout = 0s` → no watchdog element in the aggregate

use std::path::PathBuf;
use std::time::Duration;

/// Global configuration for the failover runtime.
///
/// ## Field semantics
/// - `threshold`: maximum buffer age before a source counts as stalled (Θ)
/// - `period`: health-check period (`0s` = `threshold / 4`)
/// - `settle_per_source`: start-up wait per source before the aggregate starts
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by Bus)
/// - `benign_warnings`: warning detail fragments that are not worth logging
/// - `quiet_origins`: element-name prefixes whose unrecognized messages are dropped
/// - `output_dir`: root of the per-source image directories
/// - `frame_caps`: caps both feeds of a source are normalised to
/// - `watchdog_timeout`: aggregate watchdog timeout (`0s` = disabled)
#[derive(Clone, Debug)]
pub struct Config {
    /// Unhealthy threshold Θ. A source whose last buffer is **strictly** older
    /// than this is considered stalled.
    pub threshold: Duration,

    /// Health-check period.
    ///
    /// - `Duration::ZERO` = derive as `threshold / 4`
    /// - `> 0` = explicit period
    pub period: Duration,

    /// Wait applied once per source between starting the sources and
    /// starting the aggregate, so each live feed can negotiate first.
    pub settle_per_source: Duration,

    /// Capacity of the runtime event bus.
    pub bus_capacity: usize,

    /// Capacity of the health event channel between collaborators and the run loop.
    pub health_capacity: usize,

    /// Warning details containing any of these fragments are suppressed.
    pub benign_warnings: Vec<String>,

    /// Unrecognized messages from elements whose name starts with any of these are suppressed.
    pub quiet_origins: Vec<String>,

    /// Root directory for `source_<i>/image_%05d.jpg` artifacts.
    pub output_dir: PathBuf,

    /// Caps every feed is converted to before reaching its interpipe sink.
    pub frame_caps: String,

    /// Aggregate watchdog timeout.
    pub watchdog_timeout: Duration,
}

impl Config {
    /// Returns the effective health-check period.
    ///
    /// - `period > 0` → `period`
    /// - otherwise → `threshold / 4`
    #[inline]
    pub fn check_period(&self) -> Duration {
        if self.period == Duration::ZERO {
            self.threshold / 4
        } else {
            self.period
        }
    }

    /// Returns the total settle delay for `sources` sources.
    #[inline]
    pub fn settle_delay(&self, sources: usize) -> Duration {
        self.settle_per_source
            .saturating_mul(u32::try_from(sources).unwrap_or(u32::MAX))
    }

    /// Returns the watchdog timeout as an `Option`.
    #[inline]
    pub fn watchdog(&self) -> Option<Duration> {
        if self.watchdog_timeout == Duration::ZERO {
            None
        } else {
            Some(self.watchdog_timeout)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `threshold = 10s`, `period = 0s` (→ 2.5s)
    /// - `settle_per_source = 1s`
    /// - `bus_capacity = 1024`, `health_capacity = 256`
    /// - benign warning: latency configuration failures
    /// - quiet origin: `tsdemux`
    /// - `output_dir = "."`, RGB 1080x720 frames, no watchdog
    fn default() -> Self {
        Self {
            threshold: Duration::from_secs(10),
            period: Duration::ZERO,
            settle_per_source: Duration::from_secs(1),
            bus_capacity: 1024,
            health_capacity: 256,
            benign_warnings: vec!["Impossible to configure latency".to_string()],
            quiet_origins: vec!["tsdemux".to_string()],
            output_dir: PathBuf::from("."),
            frame_caps: "video/x-raw,width=1080,height=720,format=RGB".to_string(),
            watchdog_timeout: Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_defaults_to_quarter_threshold() {
        let cfg = Config::default();
        assert_eq!(cfg.check_period(), Duration::from_millis(2500));
    }

    #[test]
    fn explicit_period_wins() {
        let cfg = Config {
            period: Duration::from_secs(1),
            ..Config::default()
        };
        assert_eq!(cfg.check_period(), Duration::from_secs(1));
    }

    #[test]
    fn settle_scales_with_sources() {
        let cfg = Config::default();
        assert_eq!(cfg.settle_delay(3), Duration::from_secs(3));
        assert_eq!(cfg.settle_delay(0), Duration::ZERO);
    }

    #[test]
    fn zero_watchdog_is_disabled() {
        let mut cfg = Config::default();
        assert!(cfg.watchdog().is_none());
        cfg.watchdog_timeout = Duration::from_secs(5);
        assert_eq!(cfg.watchdog(), Some(Duration::from_secs(5)));
    }
}
