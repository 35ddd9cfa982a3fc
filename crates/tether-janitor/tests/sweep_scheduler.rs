//! Integration tests for the sweep scheduler and janitor task.
//!
//! Uses `start_paused = true` so Tokio's clock only moves when every
//! task is idle; a one-minute interval runs in microseconds.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tether_janitor::{Janitor, JanitorConfig, SweepScheduler, SweepStats, Sweeper};

// =========================================================================
// Helpers
// =========================================================================

fn config_60s() -> JanitorConfig {
    JanitorConfig {
        initial_jitter_ms: 0,
        ..JanitorConfig::with_interval(60)
    }
}

/// The paused clock advances in whole milliseconds, so allow a little slack.
fn assert_about_secs(elapsed: Duration, secs: u64) {
    let expected = Duration::from_secs(secs);
    assert!(
        elapsed >= expected && elapsed < expected + Duration::from_millis(10),
        "expected ~{secs}s, got {elapsed:?}"
    );
}

/// Counts sweeps and pretends each one removed a peer and a room.
#[derive(Default)]
struct CountingSweeper {
    calls: AtomicUsize,
}

impl Sweeper for CountingSweeper {
    async fn sweep(&self) -> SweepStats {
        self.calls.fetch_add(1, Ordering::SeqCst);
        SweepStats {
            peers_removed: 1,
            rooms_removed: 1,
        }
    }
}

// =========================================================================
// JanitorConfig
// =========================================================================

#[test]
fn test_default_config_sweeps_every_minute() {
    let cfg = JanitorConfig::default();
    assert_eq!(cfg.interval(), Some(Duration::from_secs(60)));
    assert_eq!(cfg.initial_jitter_ms, 2_000);
}

#[test]
fn test_zero_interval_is_disabled() {
    assert_eq!(JanitorConfig::with_interval(0).interval(), None);
    assert_eq!(SweepScheduler::new(&JanitorConfig::with_interval(0)).interval(), None);
}

// =========================================================================
// Scheduler firing
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_wait_for_sweep_fires_after_interval() {
    let mut s = SweepScheduler::new(&config_60s());
    let start = tokio::time::Instant::now();

    let sweep = s.wait_for_sweep().await;

    assert_eq!(sweep, 1);
    assert_about_secs(start.elapsed(), 60);
}

#[tokio::test(start_paused = true)]
async fn test_sweeps_increment_monotonically() {
    let mut s = SweepScheduler::new(&config_60s());

    for expected in 1..=4 {
        assert_eq!(s.wait_for_sweep().await, expected);
    }
}

#[tokio::test(start_paused = true)]
async fn test_jitter_delays_only_the_first_sweep() {
    let mut s = SweepScheduler::new(&JanitorConfig {
        initial_jitter_ms: 2_000,
        ..JanitorConfig::with_interval(60)
    });
    let start = tokio::time::Instant::now();

    s.wait_for_sweep().await;
    let first = start.elapsed();
    s.wait_for_sweep().await;

    assert!(first >= Duration::from_secs(60));
    assert!(first < Duration::from_secs(62));
    assert_about_secs(start.elapsed() - first, 60);
}

#[tokio::test(start_paused = true)]
async fn test_disabled_scheduler_never_fires() {
    let mut s = SweepScheduler::new(&JanitorConfig::with_interval(0));

    let result = tokio::time::timeout(Duration::from_secs(3600), s.wait_for_sweep()).await;

    assert!(result.is_err(), "disabled scheduler should pend forever");
}

#[tokio::test(start_paused = true)]
async fn test_slow_sweep_pushes_back_the_next_one() {
    let mut s = SweepScheduler::new(&config_60s());
    s.wait_for_sweep().await;

    // The sweep itself takes 150 s, blowing through the next deadline.
    tokio::time::advance(Duration::from_secs(150)).await;
    let late = tokio::time::Instant::now();
    assert_eq!(s.wait_for_sweep().await, 2);
    assert_about_secs(late.elapsed(), 0);

    s.wait_for_sweep().await;
    assert_about_secs(late.elapsed(), 60);
}

// =========================================================================
// Janitor task
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_janitor_sweeps_on_interval() {
    let sweeper = Arc::new(CountingSweeper::default());
    let janitor = Janitor::spawn(Arc::clone(&sweeper), config_60s());

    tokio::time::sleep(Duration::from_secs(185)).await;

    assert_eq!(sweeper.calls.load(Ordering::SeqCst), 3);
    janitor.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_janitor_stop_before_first_sweep() {
    let sweeper = Arc::new(CountingSweeper::default());
    let janitor = Janitor::spawn(Arc::clone(&sweeper), config_60s());

    janitor.stop().await;
    tokio::time::sleep(Duration::from_secs(300)).await;

    assert_eq!(sweeper.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_janitor_drop_aborts_task() {
    let sweeper = Arc::new(CountingSweeper::default());
    drop(Janitor::spawn(Arc::clone(&sweeper), config_60s()));

    tokio::time::sleep(Duration::from_secs(300)).await;

    assert_eq!(sweeper.calls.load(Ordering::SeqCst), 0);
}
