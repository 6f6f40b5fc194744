//! Error types for Aletheia core operations.
//!
//! This module defines the error types used throughout the `aletheia-core` crate.

use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Aletheia core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The audit pattern is not a valid regular expression.
    #[error("Invalid audit pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The rejected pattern string.
        pattern: String,
        /// Underlying regex compilation error.
        #[source]
        source: regex::Error,
    },

    /// A timestamp format string contains unknown specifiers.
    #[error("Invalid timestamp format '{format}'")]
    InvalidTimestampFormat {
        /// The rejected format string.
        format: String,
    },

    /// Configuration file could not be read.
    #[error("Failed to load configuration from {path}: {source}")]
    ConfigLoad {
        /// Path to the configuration file.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration content could not be parsed.
    #[error("Failed to parse configuration: {reason}")]
    ConfigParse {
        /// Reason for the parse failure.
        reason: String,
    },

    /// Configuration validation failed.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        /// Reason the configuration is invalid.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_invalid_pattern() {
        let source = regex::Regex::new("(").unwrap_err();
        let err = Error::InvalidPattern {
            pattern: "(".to_string(),
            source,
        };
        assert!(err.to_string().starts_with("Invalid audit pattern '('"));
    }

    #[test]
    fn test_error_display_invalid_timestamp_format() {
        let err = Error::InvalidTimestampFormat {
            format: "%Q".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid timestamp format '%Q'");
    }

    #[test]
    fn test_error_display_invalid_config() {
        let err = Error::InvalidConfig {
            reason: "retention count must be at least 1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid configuration: retention count must be at least 1"
        );
    }
}
