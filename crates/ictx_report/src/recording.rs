//! Thread-safe in-memory reporter.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::level::ReportLevel;
use crate::reporter::BuildReporter;
use crate::time::BuildTime;

/// One message captured by a [`RecordingReporter`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// The level the message was reported at.
    pub level: ReportLevel,
    /// The message text.
    pub message: String,
}

/// A reporter that accumulates messages and phase timings in memory.
///
/// Messages below the configured minimum level are dropped. The error count is
/// tracked atomically so `has_errors` never takes the lock.
pub struct RecordingReporter {
    min_level: ReportLevel,
    reports: Mutex<Vec<Report>>,
    times: Mutex<Vec<(BuildTime, Duration)>>,
    error_count: AtomicUsize,
}

impl RecordingReporter {
    /// Creates a reporter that keeps every message, including debug ones.
    pub fn new() -> Self {
        Self::with_min_level(ReportLevel::Debug)
    }

    /// Creates a reporter that drops messages below `min_level`.
    pub fn with_min_level(min_level: ReportLevel) -> Self {
        Self {
            min_level,
            reports: Mutex::new(Vec::new()),
            times: Mutex::new(Vec::new()),
            error_count: AtomicUsize::new(0),
        }
    }

    /// Returns `true` if any error-level report has been recorded.
    pub fn has_errors(&self) -> bool {
        self.error_count.load(Ordering::Relaxed) > 0
    }

    /// Takes all accumulated reports, leaving the reporter empty.
    pub fn take_all(&self) -> Vec<Report> {
        std::mem::take(&mut *lock(&self.reports))
    }

    /// Returns a snapshot of the accumulated reports without draining.
    pub fn reports(&self) -> Vec<Report> {
        lock(&self.reports).clone()
    }

    /// Returns `true` if some recorded message contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        lock(&self.reports).iter().any(|r| r.message.contains(needle))
    }

    /// Returns a snapshot of the recorded phase timings, in recording order.
    pub fn times(&self) -> Vec<(BuildTime, Duration)> {
        lock(&self.times).clone()
    }

    /// Sum of all durations recorded for `time`.
    pub fn total_time(&self, time: BuildTime) -> Duration {
        lock(&self.times)
            .iter()
            .filter(|(t, _)| *t == time)
            .map(|(_, d)| *d)
            .sum()
    }
}

impl Default for RecordingReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildReporter for RecordingReporter {
    fn report(&self, level: ReportLevel, message: &str) {
        if !self.is_enabled(level) {
            return;
        }
        if level.is_error() {
            self.error_count.fetch_add(1, Ordering::Relaxed);
        }
        lock(&self.reports).push(Report {
            level,
            message: message.to_string(),
        });
    }

    fn add_time(&self, time: BuildTime, elapsed: Duration) {
        lock(&self.times).push((time, elapsed));
    }

    fn is_enabled(&self, level: ReportLevel) -> bool {
        level >= self.min_level
    }
}

// A panic while holding the lock only ever interrupts a push, so the data is
// still usable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
