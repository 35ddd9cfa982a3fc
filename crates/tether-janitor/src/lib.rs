//! Periodic expiry sweeps for Tether.
//!
//! The relay's presence data goes stale on its own: browsers close tabs
//! without saying goodbye, and rooms outlive their purpose. The janitor
//! runs a sweep on a fixed interval, independent of client traffic, so
//! stale peers and rooms are reclaimed even when nobody heartbeats.
//!
//! [`SweepScheduler`] is the timer, [`Sweeper`] is what runs on each
//! firing (the server implements it), and [`Janitor`] is the spawned task
//! that drives one with the other until told to stop.
//!
//! When `interval_secs` is 0 the scheduler never fires and
//! [`SweepScheduler::wait_for_sweep`] pends forever.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, info};

/// Configuration for the janitor.
#[derive(Debug, Clone)]
pub struct JanitorConfig {
    /// Seconds between sweeps. 0 = disabled (never fires).
    pub interval_secs: u64,
    /// Random jitter (0 to max ms) added to the *first* sweep so several
    /// relays started together don't sweep in lockstep.
    pub initial_jitter_ms: u64,
}

impl Default for JanitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            initial_jitter_ms: 2_000,
        }
    }
}

impl JanitorConfig {
    /// A config for a specific interval with the default jitter.
    pub fn with_interval(interval_secs: u64) -> Self {
        Self {
            interval_secs,
            ..Default::default()
        }
    }

    /// Time between sweeps. Returns `None` when disabled.
    pub fn interval(&self) -> Option<Duration> {
        if self.interval_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.interval_secs))
        }
    }
}

/// What one sweep removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub peers_removed: usize,
    pub rooms_removed: usize,
}

/// Runs one expiry sweep.
///
/// The returned future must be `Send` because the janitor drives it from
/// a spawned task.
pub trait Sweeper: Send + Sync + 'static {
    fn sweep(&self) -> impl Future<Output = SweepStats> + Send;
}

/// Fixed-interval sweep timer.
pub struct SweepScheduler {
    interval: Option<Duration>,
    next_sweep: Option<Instant>,
    sweep_count: u64,
}

impl SweepScheduler {
    /// Creates a scheduler. The first sweep fires one interval (plus
    /// jitter) from now.
    pub fn new(config: &JanitorConfig) -> Self {
        let interval = config.interval();
        let next_sweep = interval.map(|d| {
            let jitter = if config.initial_jitter_ms > 0 {
                Duration::from_millis(rand::rng().random_range(0..config.initial_jitter_ms))
            } else {
                Duration::ZERO
            };
            Instant::now() + d + jitter
        });

        Self {
            interval,
            next_sweep,
            sweep_count: 0,
        }
    }

    /// Waits until the next sweep is due and returns its number
    /// (starting at 1).
    ///
    /// The following sweep is scheduled one interval after this one
    /// fired, so a slow sweep delays the rest instead of bunching them.
    pub async fn wait_for_sweep(&mut self) -> u64 {
        let (Some(next), Some(interval)) = (self.next_sweep, self.interval) else {
            return std::future::pending().await;
        };

        time::sleep_until(next).await;

        self.sweep_count += 1;
        self.next_sweep = Some(Instant::now() + interval);
        self.sweep_count
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }
}

/// A running janitor task.
///
/// Dropping the handle aborts the task; [`Janitor::stop`] lets an
/// in-flight sweep finish first.
pub struct Janitor {
    task: Option<JoinHandle<()>>,
    stop: Arc<Notify>,
}

impl Janitor {
    /// Spawns a janitor that calls `sweeper.sweep()` on every firing.
    pub fn spawn<S: Sweeper>(sweeper: Arc<S>, config: JanitorConfig) -> Self {
        let stop = Arc::new(Notify::new());
        let mut scheduler = SweepScheduler::new(&config);

        let task = tokio::spawn({
            let stop = Arc::clone(&stop);
            async move {
                info!(interval = ?scheduler.interval(), "janitor started");
                loop {
                    tokio::select! {
                        _ = stop.notified() => break,
                        sweep = scheduler.wait_for_sweep() => {
                            let stats = sweeper.sweep().await;
                            debug!(
                                sweep,
                                peers = stats.peers_removed,
                                rooms = stats.rooms_removed,
                                "scheduled sweep finished"
                            );
                        }
                    }
                }
                info!("janitor stopped");
            }
        });

        Self {
            task: Some(task),
            stop,
        }
    }

    /// Stops the janitor after any in-flight sweep and waits for it.
    pub async fn stop(mut self) {
        self.stop.notify_one();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for Janitor {
    fn drop(&mut self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}
