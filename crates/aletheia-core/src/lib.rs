//! Core types for the Aletheia audit trail platform.
//!
//! This crate provides the pieces shared by every part of the platform:
//! - URL path canonicalization, so crafted paths cannot evade auditing
//! - the audit pattern gate with its bypass self-check
//! - the audit event model
//! - the [`AuditSink`] capability trait plus console and in-memory sinks
//! - the versioned configuration loader with environment-macro expansion
//!
//! # Example
//!
//! ```rust
//! use aletheia_core::{canonicalize, AuditPatternGate};
//!
//! let gate = AuditPatternGate::with_default_pattern();
//! let path = canonicalize("/job//test/./configSubmit");
//! assert!(gate.matches(&path));
//! ```

mod config;
mod error;
mod event;
mod gate;
mod path;
mod sink;

pub use config::{
    expand_env_macros, validate_timestamp_format, AuditConfig, ConsoleSinkConfig, FileSinkConfig,
    SinkConfig,
};
pub use error::{Error, Result};
pub use event::{AuditEvent, RequestContext};
pub use gate::{
    default_pattern, is_legacy_default_pattern, AuditPatternGate, BypassWarning, Enrichment,
    NoQueueResolver, QueueTaskResolver, KNOWN_KEYWORDS, LEGACY_DEFAULT_PATTERNS,
};
pub use path::canonicalize;
pub use sink::{AuditSink, ConsoleOutput, ConsoleSink, InMemorySink};
