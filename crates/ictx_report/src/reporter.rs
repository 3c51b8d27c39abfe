//! The reporter trait and its convenience extension.

use std::time::{Duration, Instant};

use crate::level::ReportLevel;
use crate::time::BuildTime;

/// A diagnostics sink for the transaction.
///
/// Implementations must be cheap to call; the transaction reports every stash
/// and restore operation at [`ReportLevel::Debug`].
pub trait BuildReporter: Send + Sync {
    /// Records a message at the given level.
    fn report(&self, level: ReportLevel, message: &str);

    /// Records how long a phase took. Ignored by default.
    fn add_time(&self, _time: BuildTime, _elapsed: Duration) {}

    /// Returns `false` if messages at `level` would be dropped, so callers can
    /// skip formatting them.
    fn is_enabled(&self, _level: ReportLevel) -> bool {
        true
    }
}

/// Lazily formatted reporting helpers available on every [`BuildReporter`].
pub trait ReporterExt: BuildReporter {
    /// Reports a debug message, formatting it only when debug is enabled.
    fn debug(&self, message: impl FnOnce() -> String) {
        if self.is_enabled(ReportLevel::Debug) {
            self.report(ReportLevel::Debug, &message());
        }
    }

    /// Reports an info message.
    fn info(&self, message: impl FnOnce() -> String) {
        if self.is_enabled(ReportLevel::Info) {
            self.report(ReportLevel::Info, &message());
        }
    }

    /// Reports a warning.
    fn warn(&self, message: impl FnOnce() -> String) {
        if self.is_enabled(ReportLevel::Warning) {
            self.report(ReportLevel::Warning, &message());
        }
    }

    /// Runs `f`, then records its wall-clock duration under `time`.
    fn measure<R>(&self, time: BuildTime, f: impl FnOnce() -> R) -> R {
        let start = Instant::now();
        let result = f();
        self.add_time(time, start.elapsed());
        result
    }
}

impl<T: BuildReporter + ?Sized> ReporterExt for T {}

/// A reporter that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl BuildReporter for NoopReporter {
    fn report(&self, _level: ReportLevel, _message: &str) {}

    fn is_enabled(&self, _level: ReportLevel) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Collect {
        messages: Mutex<Vec<(ReportLevel, String)>>,
        times: Mutex<Vec<BuildTime>>,
    }

    impl BuildReporter for Collect {
        fn report(&self, level: ReportLevel, message: &str) {
            self.messages.lock().unwrap().push((level, message.to_string()));
        }

        fn add_time(&self, time: BuildTime, _elapsed: Duration) {
            self.times.lock().unwrap().push(time);
        }

        fn is_enabled(&self, level: ReportLevel) -> bool {
            level >= ReportLevel::Info
        }
    }

    #[test]
    fn disabled_level_is_not_formatted() {
        let r = Collect::default();
        r.debug(|| panic!("debug message must not be built"));
        r.info(|| "built".to_string());
        let messages = r.messages.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0], (ReportLevel::Info, "built".to_string()));
    }

    #[test]
    fn measure_records_time_and_returns_value() {
        let r = Collect::default();
        let v = r.measure(BuildTime::StashFile, || 7);
        assert_eq!(v, 7);
        assert_eq!(*r.times.lock().unwrap(), vec![BuildTime::StashFile]);
    }

    #[test]
    fn works_through_trait_object() {
        let r: &dyn BuildReporter = &NoopReporter;
        r.warn(|| unreachable!());
        assert_eq!(r.measure(BuildTime::CloseCaches, || "ok"), "ok");
    }
}
