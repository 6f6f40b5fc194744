//! Sink construction from configuration.

use aletheia_core::{AuditSink, ConsoleSink, Result, SinkConfig};
use aletheia_file::{DailyLogFileSink, LineFormat, LogFileSink};
use std::sync::Arc;

/// Builds the configured sinks, in configuration order.
///
/// # Errors
///
/// Returns an error if a console sink carries an invalid timestamp format.
/// File sinks never fail construction; one that cannot open its file becomes
/// inert with a severe diagnostic.
pub fn build_sinks(configs: &[SinkConfig]) -> Result<Vec<Arc<dyn AuditSink>>> {
    configs
        .iter()
        .map(|config| -> Result<Arc<dyn AuditSink>> {
            match config {
                SinkConfig::File(file) => {
                    let format = LineFormat::with_separator(file.log_separator.as_deref());
                    if file.rotate_daily {
                        Ok(Arc::new(DailyLogFileSink::new(&file.log, file.count, format)))
                    } else {
                        Ok(Arc::new(LogFileSink::new(&file.log, format)))
                    }
                }
                SinkConfig::Console(console) => Ok(Arc::new(ConsoleSink::new(
                    console.output,
                    &console.date_format,
                    &console.log_prefix,
                )?)),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use aletheia_core::{ConsoleOutput, ConsoleSinkConfig, FileSinkConfig};
    use tempfile::TempDir;

    #[test]
    fn test_build_sinks_in_configuration_order() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("audit.log").to_str().unwrap().to_string();

        let sinks = build_sinks(&[
            SinkConfig::File(FileSinkConfig {
                log: log.clone(),
                limit: 1,
                count: 1,
                log_separator: None,
                rotate_daily: false,
            }),
            SinkConfig::File(FileSinkConfig {
                log,
                limit: 1,
                count: 3,
                log_separator: Some(" | ".to_string()),
                rotate_daily: true,
            }),
            SinkConfig::Console(ConsoleSinkConfig {
                output: ConsoleOutput::StdErr,
                date_format: "%Y-%m-%d".to_string(),
                log_prefix: String::new(),
            }),
        ])
        .unwrap();

        let names: Vec<&str> = sinks.iter().map(|sink| sink.name()).collect();
        assert_eq!(
            names,
            vec!["log_file", "log_file_daily_rotation", "console"]
        );
    }

    #[test]
    fn test_build_sinks_rejects_bad_console_format() {
        let result = build_sinks(&[SinkConfig::Console(ConsoleSinkConfig {
            output: ConsoleOutput::StdOut,
            date_format: "%Q".to_string(),
            log_prefix: String::new(),
        })]);
        assert!(result.is_err());
    }
}
