use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// State of a started ticker (SchedulerState).
struct Running {
    period: Duration,
    token: CancellationToken,
    next_fire: watch::Receiver<Instant>,
}

/// Persistent periodic ticker with explicit cancellation.
///
/// ### Responsibilities
/// - Fires `task` at `t0 + D`, `t0 + 2D`, ... where `t0` is the `start` instant
/// - Spawns every invocation separately so a slow body never shifts the cadence
/// - Cancels only the *pending* firing on [`stop`](Ticker::stop)
///
/// Must be started from inside a tokio runtime.
#[derive(Default)]
pub struct Ticker {
    state: Mutex<Option<Running>>,
}

impl Ticker {
    /// Creates an idle ticker.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(None),
        }
    }

    /// Starts firing `task` every `period`.
    ///
    /// Returns `false` (and does nothing) if the ticker is already running
    /// or `period` is zero.
    pub fn start<F, Fut>(&self, period: Duration, task: F) -> bool
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut state = self.lock();
        if state.is_some() {
            trace!("ticker already running; start ignored");
            return false;
        }
        if period.is_zero() {
            warn!("ticker period must be non-zero; start ignored");
            return false;
        }

        let token = CancellationToken::new();
        let first = Instant::now() + period;
        let (tx, rx) = watch::channel(first);

        tokio::spawn(drive(period, first, task, token.clone(), tx));
        debug!(period_ms = period.as_millis() as u64, "ticker started");

        *state = Some(Running {
            period,
            token,
            next_fire: rx,
        });
        true
    }

    /// Cancels the pending firing. Invocations already in flight run to completion.
    ///
    /// Returns `false` if the ticker was not running.
    pub fn stop(&self) -> bool {
        match self.lock().take() {
            Some(running) => {
                running.token.cancel();
                debug!("ticker stopped");
                true
            }
            None => false,
        }
    }

    /// True between a successful `start` and the next `stop`.
    pub fn is_running(&self) -> bool {
        self.lock().is_some()
    }

    /// Scheduled instant of the next firing, if running.
    pub fn next_fire(&self) -> Option<Instant> {
        self.lock().as_ref().map(|r| *r.next_fire.borrow())
    }

    /// Period of the running cadence, if running.
    pub fn period(&self) -> Option<Duration> {
        self.lock().as_ref().map(|r| r.period)
    }

    fn lock(&self) -> MutexGuard<'_, Option<Running>> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        if let Some(running) = self.lock().take() {
            running.token.cancel();
        }
    }
}

/// Ticker loop: sleeps until the scheduled instant, spawns the task, then
/// advances the schedule by exactly one period.
async fn drive<F, Fut>(
    period: Duration,
    mut next: Instant,
    task: F,
    token: CancellationToken,
    next_fire: watch::Sender<Instant>,
) where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    loop {
        next_fire.send_replace(next);
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = time::sleep_until(next) => {}
        }
        tokio::spawn(task());
        next += period;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    const D: Duration = Duration::from_millis(2500);

    fn recorder() -> (
        impl Fn() -> std::pin::Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync + 'static,
        mpsc::UnboundedReceiver<Instant>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = move || {
            let tx = tx.clone();
            Box::pin(async move {
                let _ = tx.send(Instant::now());
                // Slower than two whole periods.
                time::sleep(Duration::from_secs(6)).await;
            }) as std::pin::Pin<Box<dyn Future<Output = ()> + Send>>
        };
        (task, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn slow_task_does_not_shift_cadence() {
        let ticker = Ticker::new();
        let (task, mut rx) = recorder();

        let t0 = Instant::now();
        assert!(ticker.start(D, task));

        for m in 1..=6u32 {
            let fired = rx.recv().await.unwrap();
            let expected = t0 + D * m;
            let skew = if fired > expected {
                fired - expected
            } else {
                expected - fired
            };
            assert!(skew <= Duration::from_millis(5), "tick {m} skewed by {skew:?}");
        }
        ticker.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn next_fire_advances_by_exact_period() {
        let ticker = Ticker::new();
        let t0 = Instant::now();
        ticker.start(D, || async {});
        assert_eq!(ticker.next_fire(), Some(t0 + D));

        time::sleep(D + Duration::from_millis(10)).await;
        assert_eq!(ticker.next_fire(), Some(t0 + D * 2));
        assert_eq!(ticker.period(), Some(D));
    }

    #[tokio::test(start_paused = true)]
    async fn second_start_is_noop() {
        let ticker = Ticker::new();
        let count = Arc::new(AtomicUsize::new(0));

        let c1 = Arc::clone(&count);
        assert!(ticker.start(D, move || {
            let c = Arc::clone(&c1);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        }));
        let c2 = Arc::clone(&count);
        assert!(!ticker.start(D, move || {
            let c = Arc::clone(&c2);
            async move {
                c.fetch_add(100, Ordering::SeqCst);
            }
        }));

        time::sleep(D * 3 + Duration::from_millis(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_pending_but_not_inflight() {
        let ticker = Ticker::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicBool::new(false));

        let (f, done) = (Arc::clone(&fired), Arc::clone(&finished));
        ticker.start(D, move || {
            let f = Arc::clone(&f);
            let done = Arc::clone(&done);
            async move {
                f.fetch_add(1, Ordering::SeqCst);
                time::sleep(Duration::from_secs(1)).await;
                done.store(true, Ordering::SeqCst);
            }
        });

        // First firing is in flight.
        time::sleep(D + Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(ticker.stop());
        assert!(!ticker.is_running());
        assert!(ticker.next_fire().is_none());

        time::sleep(D * 4).await;
        assert!(finished.load(Ordering::SeqCst), "in-flight invocation must complete");
        assert_eq!(fired.load(Ordering::SeqCst), 1, "no firing after stop");
        assert!(!ticker.stop());
    }

    #[tokio::test(start_paused = true)]
    async fn restart_after_stop_resumes_from_now() {
        let ticker = Ticker::new();
        ticker.start(D, || async {});
        time::sleep(Duration::from_millis(3700)).await;
        ticker.stop();

        time::sleep(Duration::from_millis(1234)).await;
        let t1 = Instant::now();
        assert!(ticker.start(D, || async {}));
        assert_eq!(ticker.next_fire(), Some(t1 + D));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_period_is_rejected() {
        let ticker = Ticker::new();
        assert!(!ticker.start(Duration::ZERO, || async {}));
        assert!(!ticker.is_running());
    }
}
