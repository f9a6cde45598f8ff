//! Progress reporting for long scans.
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::info;

/// Receives `(current_height, last_height, matches)` after every height.
///
/// Called on the scan path, so implementations must return promptly.
pub trait ProgressReporter: Send + Sync {
    /// `current` was just completed out of `total`; `matches` rows so far.
    fn report(&self, current: u64, total: u64, matches: u64);
}

/// Discards reports.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _current: u64, _total: u64, _matches: u64) {}
}

struct Window {
    started: Instant,
    last_report: Instant,
    last_height: Option<u64>,
}

/// Logs speed and ETA through `tracing`, at most once per `interval`.
pub struct LogProgress {
    interval: Duration,
    window: Mutex<Window>,
}

impl LogProgress {
    /// Reporter logging at most once per `interval`, plus a final line.
    pub fn new(interval: Duration) -> Self {
        let now = Instant::now();
        Self {
            interval,
            window: Mutex::new(Window {
                started: now,
                last_report: now,
                last_height: None,
            }),
        }
    }
}

impl ProgressReporter for LogProgress {
    fn report(&self, current: u64, total: u64, matches: u64) {
        // Never wait on a concurrent reporter.
        let Ok(mut w) = self.window.try_lock() else {
            return;
        };
        let from = *w.last_height.get_or_insert(current);
        let elapsed = w.last_report.elapsed();
        if elapsed < self.interval && current < total {
            return;
        }

        let secs = elapsed.as_secs_f64().max(f64::EPSILON);
        let speed = current.saturating_sub(from) as f64 / secs;
        let eta = if speed > 0.0 {
            Some(Duration::from_secs_f64(
                total.saturating_sub(current) as f64 / speed,
            ))
        } else {
            None
        };
        info!(
            block = current,
            last = total,
            matches,
            blocks_per_sec = speed.round() as u64,
            runtime = ?w.started.elapsed(),
            eta = ?eta,
            "scan progress"
        );
        w.last_report = Instant::now();
        w.last_height = Some(current);
    }
}
