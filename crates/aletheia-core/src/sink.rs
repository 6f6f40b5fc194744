//! Audit sink trait and the built-in console/in-memory sinks.

use crate::config::validate_timestamp_format;
use crate::error::Result;
use chrono::Local;
use std::fmt::Debug;
use std::io::Write;
use std::sync::Mutex;

/// Destination for formatted audit event lines.
///
/// `log` must never panic or propagate failures to the caller: a broken sink
/// logs its own diagnostics and drops the event. `close` releases any held
/// resources at reconfiguration or shutdown and is idempotent.
pub trait AuditSink: Send + Sync + Debug {
    /// Records one audit event.
    fn log(&self, event: &str);

    /// Releases resources held by the sink.
    fn close(&self) {}

    /// Returns the sink name for diagnostics.
    fn name(&self) -> &'static str;
}

/// Which standard stream a [`ConsoleSink`] writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConsoleOutput {
    /// Standard output.
    #[default]
    StdOut,
    /// Standard error.
    StdErr,
}

/// Sink that writes audit lines to stdout or stderr.
///
/// Lines are rendered as `"<timestamp><prefix> - <event>"` where the prefix
/// block is `" - [<log prefix>]"` when a prefix is configured and empty
/// otherwise.
#[derive(Debug)]
pub struct ConsoleSink {
    output: ConsoleOutput,
    date_format: String,
    log_prefix: String,
}

impl ConsoleSink {
    /// Default timestamp format for console output.
    pub const DEFAULT_DATE_FORMAT: &'static str = "%Y-%m-%d %H:%M:%S%.3f";

    /// Creates a console sink.
    ///
    /// # Errors
    ///
    /// Returns an error if `date_format` is not a valid timestamp format.
    pub fn new(output: ConsoleOutput, date_format: &str, log_prefix: &str) -> Result<Self> {
        validate_timestamp_format(date_format)?;
        Ok(Self {
            output,
            date_format: date_format.to_string(),
            log_prefix: log_prefix.to_string(),
        })
    }

    fn render(&self, event: &str) -> String {
        let timestamp = Local::now().format(&self.date_format);
        if self.log_prefix.is_empty() {
            format!("{timestamp} - {event}")
        } else {
            format!("{timestamp} - [{}] - {event}", self.log_prefix)
        }
    }
}

impl AuditSink for ConsoleSink {
    fn log(&self, event: &str) {
        let line = self.render(event);
        match self.output {
            ConsoleOutput::StdOut => {
                let _ = writeln!(std::io::stdout(), "{line}");
            }
            ConsoleOutput::StdErr => {
                let _ = writeln!(std::io::stderr(), "{line}");
            }
        }
    }

    fn name(&self) -> &'static str {
        "console"
    }
}

/// In-memory sink for testing.
#[derive(Debug, Default)]
pub struct InMemorySink {
    events: Mutex<Vec<String>>,
}

impl InMemorySink {
    /// Creates a new in-memory sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all logged events.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    /// Clears all logged events.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl AuditSink for InMemorySink {
    fn log(&self, event: &str) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.to_string());
        }
    }

    fn name(&self) -> &'static str {
        "in_memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_sink_rejects_bad_date_format() {
        assert!(ConsoleSink::new(ConsoleOutput::StdOut, "%Q", "").is_err());
    }

    #[test]
    fn test_console_sink_render_without_prefix() {
        let sink = ConsoleSink::new(ConsoleOutput::StdOut, "%Y", "").unwrap();
        let line = sink.render("/job/test/enable by alice from 10.0.0.1");
        assert!(line.ends_with(" - /job/test/enable by alice from 10.0.0.1"));
    }

    #[test]
    fn test_console_sink_render_with_prefix() {
        let sink = ConsoleSink::new(ConsoleOutput::StdErr, "%Y", "ci").unwrap();
        let line = sink.render("event");
        assert!(line.contains(" - [ci] - event"));
    }

    #[test]
    fn test_in_memory_sink_records_and_clears() {
        let sink = InMemorySink::new();
        sink.log("first");
        sink.log("second");
        assert_eq!(sink.events(), vec!["first", "second"]);

        sink.clear();
        assert!(sink.events().is_empty());
    }
}
