//! Log file sinks.
//!
//! Two sinks live here: [`LogFileSink`] appends to exactly the configured
//! path, [`DailyLogFileSink`] writes to a dated file per calendar day and
//! prunes history past the retention count. Both are deliberately unable to
//! fail from the caller's point of view: a sink that cannot open its file
//! becomes inert with a severe diagnostic, and write errors drop the single
//! event instead of propagating. Auditing must never break the audited
//! action.

use crate::rotation::{self, FileEntry};
use aletheia_core::{expand_env_macros, validate_timestamp_format, AuditSink, Result};
use chrono::{DateTime, Local};
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

/// Source of "now" for rotation decisions, injectable for tests.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Returns the current local time.
    fn now(&self) -> DateTime<Local>;
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Rendering of one audit line: timestamp, separator, event text.
#[derive(Debug, Clone)]
pub struct LineFormat {
    timestamp_format: String,
    separator: String,
}

impl LineFormat {
    /// Default timestamp pattern, e.g. `Aug 25, 2026 3:41:07,512 PM`.
    pub const DEFAULT_TIMESTAMP_FORMAT: &'static str = "%b %-d, %Y %-I:%M:%S,%3f %p";

    /// Default separator between timestamp and event.
    pub const DEFAULT_SEPARATOR: &'static str = " ";

    /// Creates a line format.
    ///
    /// # Errors
    ///
    /// Returns an error if `timestamp_format` is not a valid format string.
    pub fn new(timestamp_format: &str, separator: &str) -> Result<Self> {
        validate_timestamp_format(timestamp_format)?;
        Ok(Self {
            timestamp_format: timestamp_format.to_string(),
            separator: separator.to_string(),
        })
    }

    /// Creates the default format with a custom separator.
    #[must_use]
    pub fn with_separator(separator: Option<&str>) -> Self {
        Self {
            timestamp_format: Self::DEFAULT_TIMESTAMP_FORMAT.to_string(),
            separator: separator.unwrap_or(Self::DEFAULT_SEPARATOR).to_string(),
        }
    }

    fn render(&self, now: DateTime<Local>, event: &str) -> String {
        format!(
            "{}{}{}",
            now.format(&self.timestamp_format),
            self.separator,
            event
        )
    }
}

impl Default for LineFormat {
    fn default() -> Self {
        Self::with_separator(None)
    }
}

/// Opens `path` for appending, creating missing parent directories.
///
/// The first failure with a missing-file class error triggers one
/// `create_dir_all` on the parent followed by exactly one retry; any other
/// failure is returned as is.
fn open_with_retry(path: &Path) -> std::io::Result<File> {
    let open = || OpenOptions::new().create(true).append(true).open(path);
    match open() {
        Ok(file) => Ok(file),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            info!(path = %path.display(), "log directory missing, creating intermediate directories");
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            open()
        }
        Err(err) => Err(err),
    }
}

fn open_or_go_inert(path: &Path) -> Option<File> {
    match open_with_retry(path) {
        Ok(file) => Some(file),
        Err(err) => {
            error!(
                path = %path.display(),
                error = %err,
                "could not open audit log file, sink will stay inactive"
            );
            None
        }
    }
}

fn write_line(file: &mut Option<File>, format: &LineFormat, now: DateTime<Local>, event: &str) {
    let Some(open_file) = file.as_mut() else {
        return;
    };
    let line = format.render(now, event);
    if let Err(err) = writeln!(open_file, "{line}").and_then(|()| open_file.flush()) {
        error!(error = %err, "failed to write audit event, dropping it");
    }
}

/// Sink that appends audit lines to the configured path.
///
/// `${VAR}` macros in the path are expanded once at construction. A sink
/// whose file cannot be opened even after directory creation is inert for
/// its lifetime.
#[derive(Debug)]
pub struct LogFileSink {
    format: LineFormat,
    clock: Arc<dyn Clock>,
    file: Mutex<Option<File>>,
    path: PathBuf,
}

impl LogFileSink {
    /// Creates a plain log file sink.
    #[must_use]
    pub fn new(log: &str, format: LineFormat) -> Self {
        Self::with_clock(log, format, Arc::new(SystemClock))
    }

    /// Creates a plain log file sink with an explicit clock.
    #[must_use]
    pub fn with_clock(log: &str, format: LineFormat, clock: Arc<dyn Clock>) -> Self {
        let path = PathBuf::from(expand_env_macros(log));
        let file = Mutex::new(open_or_go_inert(&path));
        Self {
            format,
            clock,
            file,
            path,
        }
    }

    /// Returns the resolved log path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for LogFileSink {
    fn log(&self, event: &str) {
        let now = self.clock.now();
        write_line(&mut self.file.lock(), &self.format, now, event);
    }

    fn close(&self) {
        self.file.lock().take();
    }

    fn name(&self) -> &'static str {
        "log_file"
    }
}

struct DailyState {
    period_start: DateTime<Local>,
    file: Option<File>,
}

/// Sink that writes one dated file per calendar day.
///
/// On construction the active period is recovered from the files already on
/// disk, so two instances created within the same day append to the same
/// dated file. After each rotation, history beyond the retention count is
/// deleted, oldest first.
#[derive(Debug)]
pub struct DailyLogFileSink {
    base_path: PathBuf,
    retention: usize,
    format: LineFormat,
    clock: Arc<dyn Clock>,
    state: Mutex<DailyState>,
}

impl std::fmt::Debug for DailyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DailyState")
            .field("period_start", &self.period_start)
            .field("open", &self.file.is_some())
            .finish()
    }
}

impl DailyLogFileSink {
    /// Creates a daily-rotating sink.
    #[must_use]
    pub fn new(log: &str, retention: usize, format: LineFormat) -> Self {
        Self::with_clock(log, retention, format, Arc::new(SystemClock))
    }

    /// Creates a daily-rotating sink with an explicit clock.
    #[must_use]
    pub fn with_clock(
        log: &str,
        retention: usize,
        format: LineFormat,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let base_path = PathBuf::from(expand_env_macros(log));
        let now = clock.now();
        let period_start =
            rotation::recover_period_start(&rotated_entries(&base_path), &base_path, now);
        let file = open_or_go_inert(&rotation::period_file_name(period_start, &base_path));
        Self {
            base_path,
            retention,
            format,
            clock,
            state: Mutex::new(DailyState { period_start, file }),
        }
    }

    /// Returns the path of the active period's file.
    #[must_use]
    pub fn current_file(&self) -> PathBuf {
        rotation::period_file_name(self.state.lock().period_start, &self.base_path)
    }

    fn rotate(&self, state: &mut DailyState, now: DateTime<Local>) {
        state.file.take();
        state.period_start = rotation::start_of_day(now);
        state.file =
            open_or_go_inert(&rotation::period_file_name(state.period_start, &self.base_path));
        self.prune();
    }

    fn prune(&self) {
        let entries = rotated_entries(&self.base_path);
        for path in rotation::files_to_prune(&entries, self.retention) {
            if let Err(err) = fs::remove_file(&path) {
                error!(path = %path.display(), error = %err, "could not remove rotated audit file");
            }
        }
    }
}

impl AuditSink for DailyLogFileSink {
    fn log(&self, event: &str) {
        let now = self.clock.now();
        let mut state = self.state.lock();
        // Re-check under the lock so concurrent callers rotate exactly once.
        if rotation::should_rotate(now, state.period_start) {
            self.rotate(&mut state, now);
        }
        write_line(&mut state.file, &self.format, now, event);
    }

    fn close(&self) {
        self.state.lock().file.take();
    }

    fn name(&self) -> &'static str {
        "log_file_daily_rotation"
    }
}

/// Lists rotated companions of `base_path` with their last-modified times.
fn rotated_entries(base_path: &Path) -> Vec<FileEntry> {
    let Some(parent) = base_path.parent() else {
        return Vec::new();
    };
    let base = base_path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    let Ok(dir) = fs::read_dir(parent) else {
        return Vec::new();
    };
    dir.flatten()
        .filter(|candidate| {
            candidate
                .file_name()
                .to_str()
                .is_some_and(|name| rotation::is_rotated_file(name, base))
        })
        .filter_map(|candidate| {
            let modified = candidate.metadata().and_then(|meta| meta.modified()).ok()?;
            Some(FileEntry {
                path: candidate.path(),
                modified,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_format_render() {
        let format = LineFormat::new("%Y-%m-%d", " | ").unwrap();
        let now = Local::now();
        let line = format.render(now, "event text");
        assert!(line.ends_with(" | event text"));
    }

    #[test]
    fn test_line_format_rejects_bad_pattern() {
        assert!(LineFormat::new("%Q", " ").is_err());
    }

    #[test]
    fn test_line_format_default_separator() {
        let format = LineFormat::with_separator(None);
        let line = format.render(Local::now(), "x");
        assert!(line.ends_with(" x"));
    }
}
