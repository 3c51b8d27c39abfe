//! Build reporting for incremental compilation transactions.
//!
//! A [`BuildReporter`] receives human-readable progress messages and phase
//! timings from the transaction. It is purely observational: no transaction
//! behavior depends on what a reporter does with a message. The
//! [`TracingReporter`] forwards everything to `tracing`, while the
//! [`RecordingReporter`] keeps reports in memory for tests and summaries.

#![warn(missing_docs)]

pub mod level;
pub mod recording;
pub mod reporter;
pub mod time;
pub mod tracing_reporter;

pub use level::ReportLevel;
pub use recording::{RecordingReporter, Report};
pub use reporter::{BuildReporter, NoopReporter, ReporterExt};
pub use time::BuildTime;
pub use tracing_reporter::TracingReporter;
