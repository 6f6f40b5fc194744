//! Configuration model for the audit trail.
//!
//! Configuration is applied atomically: a candidate is parsed, migrated from
//! legacy layouts if needed and fully validated before it replaces the active
//! configuration. A rejected candidate leaves the previous configuration in
//! effect.

use crate::error::{Error, Result};
use crate::gate::{default_pattern, AuditPatternGate};
use crate::sink::ConsoleOutput;
use chrono::format::{Item, StrftimeItems};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Validates a `strftime`-style timestamp format string.
///
/// # Errors
///
/// Returns [`Error::InvalidTimestampFormat`] if the format contains unknown
/// specifiers.
pub fn validate_timestamp_format(format: &str) -> Result<()> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(Error::InvalidTimestampFormat {
            format: format.to_string(),
        });
    }
    Ok(())
}

/// Expands `${VAR}` environment-variable macros in a configured path.
///
/// Unset variables are left untouched, matching the host's macro expansion
/// behavior. Expansion happens once, at configuration load.
#[must_use]
pub fn expand_env_macros(input: &str) -> String {
    let matcher = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("macro regex compiles");
    matcher
        .replace_all(input, |captures: &regex::Captures<'_>| {
            std::env::var(&captures[1]).unwrap_or_else(|_| captures[0].to_string())
        })
        .into_owned()
}

/// Configuration of a single audit sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SinkConfig {
    /// Log file sink, plain or daily-rotating.
    File(FileSinkConfig),
    /// Console sink.
    Console(ConsoleSinkConfig),
}

/// Configuration of a log file sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSinkConfig {
    /// Path of the log file; supports `${VAR}` macros.
    pub log: String,

    /// Size limit in MB per file in size-rotation mode. Ignored when
    /// `rotate_daily` is set.
    #[serde(default = "default_limit")]
    pub limit: u64,

    /// Number of historical files to retain.
    #[serde(default = "default_count")]
    pub count: usize,

    /// Separator between the timestamp and the event text.
    #[serde(default)]
    pub log_separator: Option<String>,

    /// Rotate by calendar day instead of by size.
    #[serde(default)]
    pub rotate_daily: bool,
}

/// Configuration of a console sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleSinkConfig {
    /// Target stream.
    #[serde(default)]
    pub output: ConsoleOutput,

    /// Timestamp format for console lines.
    #[serde(default = "default_console_date_format")]
    pub date_format: String,

    /// Optional prefix inserted between the timestamp and the event.
    #[serde(default)]
    pub log_prefix: String,
}

/// Top-level audit trail configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Audit-worthiness pattern applied to canonicalized request paths.
    #[serde(default = "default_pattern")]
    pub pattern: String,

    /// Configured sinks, in fan-out order.
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,

    /// Log the causes of started builds.
    #[serde(default = "default_true")]
    pub log_build_cause: bool,

    /// Log credential usages.
    #[serde(default = "default_true")]
    pub log_credentials_usage: bool,

    /// Log script executions.
    #[serde(default = "default_true")]
    pub log_script_usage: bool,

    /// Log the user's display name instead of the id.
    #[serde(default)]
    pub display_user_name: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            pattern: default_pattern(),
            sinks: Vec::new(),
            log_build_cause: true,
            log_credentials_usage: true,
            log_script_usage: true,
            display_user_name: false,
        }
    }
}

/// Raw on-disk layout covering both the current and the legacy shape.
///
/// Up to layout version 1 the file target lived as bare `log`/`limit`/`count`
/// fields at the top level; the loader maps those into a [`SinkConfig::File`]
/// entry once, at load time, so nothing downstream has to know about the old
/// shape.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    version: Option<u32>,
    pattern: Option<String>,
    sinks: Vec<SinkConfig>,
    log: Option<String>,
    limit: Option<u64>,
    count: Option<usize>,
    log_build_cause: Option<bool>,
    log_credentials_usage: Option<bool>,
    log_script_usage: Option<bool>,
    display_user_name: Option<bool>,
}

impl AuditConfig {
    /// Parses a configuration document (YAML or JSON).
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be parsed or fails validation.
    pub fn parse(content: &str) -> Result<Self> {
        let raw: RawConfig = serde_yaml::from_str(content).map_err(|e| Error::ConfigParse {
            reason: e.to_string(),
        })?;
        Self::migrate(raw)
    }

    /// Loads and parses a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigLoad {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content)
    }

    fn migrate(raw: RawConfig) -> Result<Self> {
        if let Some(version) = raw.version {
            if version > 2 {
                return Err(Error::ConfigParse {
                    reason: format!("unsupported configuration version {version}"),
                });
            }
        }

        let mut sinks = raw.sinks;
        if let Some(log) = raw.log {
            sinks.push(SinkConfig::File(FileSinkConfig {
                log,
                limit: raw.limit.unwrap_or_else(default_limit),
                count: raw.count.unwrap_or_else(default_count),
                log_separator: None,
                rotate_daily: false,
            }));
        }

        let config = Self {
            pattern: raw.pattern.unwrap_or_else(default_pattern),
            sinks,
            log_build_cause: raw.log_build_cause.unwrap_or(true),
            log_credentials_usage: raw.log_credentials_usage.unwrap_or(true),
            log_script_usage: raw.log_script_usage.unwrap_or(true),
            display_user_name: raw.display_user_name.unwrap_or(false),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern does not compile, a timestamp format
    /// is invalid, or a retention count is zero.
    pub fn validate(&self) -> Result<()> {
        AuditPatternGate::new(&self.pattern)?;
        for sink in &self.sinks {
            match sink {
                SinkConfig::File(file) => {
                    if file.count == 0 {
                        return Err(Error::InvalidConfig {
                            reason: format!(
                                "retention count must be at least 1 for log file '{}'",
                                file.log
                            ),
                        });
                    }
                }
                SinkConfig::Console(console) => {
                    validate_timestamp_format(&console.date_format)?;
                }
            }
        }
        Ok(())
    }
}

fn default_limit() -> u64 {
    1
}

fn default_count() -> usize {
    1
}

const fn default_true() -> bool {
    true
}

fn default_console_date_format() -> String {
    crate::sink::ConsoleSink::DEFAULT_DATE_FORMAT.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_timestamp_format_accepts_default() {
        assert!(validate_timestamp_format("%b %-d, %Y %-I:%M:%S,%3f %p").is_ok());
    }

    #[test]
    fn test_validate_timestamp_format_rejects_unknown_specifier() {
        assert!(validate_timestamp_format("%Q").is_err());
    }

    #[test]
    fn test_expand_env_macros() {
        std::env::set_var("ALETHEIA_TEST_DIR", "/var/log/ci");
        assert_eq!(
            expand_env_macros("${ALETHEIA_TEST_DIR}/audit.log"),
            "/var/log/ci/audit.log"
        );
    }

    #[test]
    fn test_expand_env_macros_keeps_unset_vars() {
        assert_eq!(
            expand_env_macros("${ALETHEIA_TEST_UNSET_VAR}/audit.log"),
            "${ALETHEIA_TEST_UNSET_VAR}/audit.log"
        );
    }

    #[test]
    fn test_parse_current_layout() {
        let config = AuditConfig::parse(
            r"
version: 2
pattern: '.*/(?:enable|createItem)/?.*'
sinks:
  - type: file
    log: /var/log/audit.log
    count: 5
    rotate_daily: true
  - type: console
    output: std_err
",
        )
        .unwrap();

        assert_eq!(config.pattern, ".*/(?:enable|createItem)/?.*");
        assert_eq!(config.sinks.len(), 2);
        assert!(matches!(
            &config.sinks[0],
            SinkConfig::File(file) if file.rotate_daily && file.count == 5
        ));
    }

    #[test]
    fn test_legacy_layout_migrates_to_file_sink() {
        let config = AuditConfig::parse(
            r"
log: /var/log/audit.log
limit: 25
count: 3
",
        )
        .unwrap();

        assert_eq!(config.sinks.len(), 1);
        let SinkConfig::File(file) = &config.sinks[0] else {
            panic!("expected a file sink");
        };
        assert_eq!(file.log, "/var/log/audit.log");
        assert_eq!(file.limit, 25);
        assert_eq!(file.count, 3);
        assert!(!file.rotate_daily);
        // The legacy layout never carried a pattern; the default applies.
        assert_eq!(config.pattern, default_pattern());
    }

    #[test]
    fn test_invalid_pattern_rejected_at_load() {
        let err = AuditConfig::parse("pattern: '('").unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { .. }));
    }

    #[test]
    fn test_zero_retention_count_rejected() {
        let err = AuditConfig::parse(
            r"
sinks:
  - type: file
    log: /var/log/audit.log
    count: 0
",
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }

    #[test]
    fn test_unsupported_version_rejected() {
        let err = AuditConfig::parse("version: 99").unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));
    }

    #[test]
    fn test_defaults() {
        let config = AuditConfig::default();
        assert!(config.log_build_cause);
        assert!(config.log_credentials_usage);
        assert!(config.log_script_usage);
        assert!(!config.display_user_name);
        assert!(config.sinks.is_empty());
    }
}
