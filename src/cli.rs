//! Command-line surface.
//!
//! ```text
//! feedvisor [OPTIONS] <ADDRESS>...
//! ```
//!
//! At least one source address is required; with none, usage is printed and
//! nothing is started.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::config::Config;

/// Live video failover: routes stalled feeds to a synthetic fallback until they recover.
#[derive(Parser, Debug, Clone)]
#[command(name = "feedvisor", version, about)]
pub struct Cli {
    /// Source addresses (e.g. rtsp://host/stream), one per source, in index order.
    #[arg(required = true, num_args = 1.., value_name = "ADDRESS")]
    pub addresses: Vec<String>,

    /// Seconds without a buffer before a source counts as stalled (must be > 0).
    #[arg(long, default_value = "10", value_parser = parse_threshold)]
    pub threshold: Duration,

    /// Health-check period in seconds (0 = threshold / 4).
    #[arg(long, default_value = "0", value_parser = parse_secs)]
    pub period: Duration,

    /// Directory receiving the per-source image sequences.
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Seconds to wait per source before the aggregate starts.
    #[arg(long, default_value = "1", value_parser = parse_secs)]
    pub settle: Duration,

    /// Aggregate watchdog timeout in seconds (0 = no watchdog).
    #[arg(long, default_value = "0", value_parser = parse_secs)]
    pub watchdog: Duration,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub log_json: bool,
}

fn parse_secs(s: &str) -> Result<Duration, String> {
    let v: f64 = s.parse().map_err(|e| format!("{s:?} is not a number: {e}"))?;
    if !v.is_finite() || v < 0.0 {
        return Err(format!("{s:?} must be a non-negative number of seconds"));
    }
    Duration::try_from_secs_f64(v).map_err(|e| format!("{s:?} is out of range: {e}"))
}

fn parse_threshold(s: &str) -> Result<Duration, String> {
    let d = parse_secs(s)?;
    if d.is_zero() {
        return Err(format!("{s:?} must be greater than zero"));
    }
    Ok(d)
}

impl Cli {
    /// Builds the runtime configuration, starting from [`Config::default`].
    pub fn to_config(&self) -> Config {
        Config {
            threshold: self.threshold,
            period: self.period,
            settle_per_source: self.settle,
            watchdog_timeout: self.watchdog,
            output_dir: self.output_dir.clone(),
            ..Config::default()
        }
    }
}
