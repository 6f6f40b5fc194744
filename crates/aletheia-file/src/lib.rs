//! Log file sinks for the Aletheia audit trail platform.
//!
//! This crate owns the only non-trivial persistence in the platform: the
//! daily-rotating audit log writer. Rotation decisions (when to rotate, what
//! the dated file is called, what to prune) are pure functions in
//! [`rotation`]; the sinks in [`writer`] apply them to the filesystem.
//!
//! # Example
//!
//! ```no_run
//! use aletheia_core::AuditSink;
//! use aletheia_file::{DailyLogFileSink, LineFormat};
//!
//! let sink = DailyLogFileSink::new("/var/log/ci/audit.log", 7, LineFormat::default());
//! sink.log("/job/test-job/enable by alice from 10.0.0.1");
//! ```

pub mod rotation;
mod writer;

pub use rotation::{
    files_to_prune, is_rotated_file, period_file_name, recover_period_start, should_rotate,
    start_of_day, FileEntry, ROTATED_DATE_FORMAT,
};
pub use writer::{Clock, DailyLogFileSink, LineFormat, LogFileSink, SystemClock};
