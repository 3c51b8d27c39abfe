//! Reporter that forwards to `tracing`.

use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::level::ReportLevel;
use crate::reporter::BuildReporter;
use crate::time::BuildTime;

/// Forwards reports to the `tracing` macros under the `ictx` target.
///
/// Filtering is left to the installed subscriber, except for `min_level`,
/// which lets a configuration silence debug chatter without touching the
/// subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter {
    min_level: ReportLevel,
}

impl TracingReporter {
    /// Creates a reporter that forwards messages at `min_level` and above.
    pub fn new(min_level: ReportLevel) -> Self {
        Self { min_level }
    }
}

impl BuildReporter for TracingReporter {
    fn report(&self, level: ReportLevel, message: &str) {
        if !self.is_enabled(level) {
            return;
        }
        match level {
            ReportLevel::Debug => debug!(target: "ictx", "{message}"),
            ReportLevel::Info => info!(target: "ictx", "{message}"),
            ReportLevel::Warning => warn!(target: "ictx", "{message}"),
            ReportLevel::Error => error!(target: "ictx", "{message}"),
        }
    }

    fn add_time(&self, time: BuildTime, elapsed: Duration) {
        if self.is_enabled(ReportLevel::Debug) {
            debug!(
                target: "ictx",
                metric = time.name(),
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                "phase finished"
            );
        }
    }

    fn is_enabled(&self, level: ReportLevel) -> bool {
        level >= self.min_level
    }
}
