//! The audit dispatcher, join point between the host and the sinks.

use crate::sinks::build_sinks;
use crate::worker::SerialWorker;
use aletheia_core::{
    canonicalize, AuditConfig, AuditEvent, AuditPatternGate, AuditSink, BypassWarning,
    NoQueueResolver, QueueTaskResolver, RequestContext, Result,
};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

/// Receives intercepted requests and host events, gates them, and fans the
/// formatted lines out to the configured sinks via the serial worker.
///
/// The pattern gate is owned here and swapped atomically on reconfiguration;
/// a pattern that fails to compile leaves the previous gate active, so the
/// dispatcher is never left without a pattern.
pub struct AuditDispatcher {
    gate: RwLock<Arc<AuditPatternGate>>,
    resolver: Arc<dyn QueueTaskResolver>,
    worker: SerialWorker,
    log_build_cause: bool,
    log_credentials_usage: bool,
    log_script_usage: bool,
}

impl AuditDispatcher {
    /// Creates a builder for configuring the dispatcher.
    #[must_use]
    pub fn builder() -> AuditDispatcherBuilder {
        AuditDispatcherBuilder::new()
    }

    /// Builds a dispatcher from a loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern does not compile or a sink fails
    /// validation.
    pub fn from_config(config: &AuditConfig) -> Result<Self> {
        let mut builder = Self::builder()
            .with_pattern(&config.pattern)?
            .log_build_cause(config.log_build_cause)
            .log_credentials_usage(config.log_credentials_usage)
            .log_script_usage(config.log_script_usage);
        for sink in build_sinks(&config.sinks)? {
            builder = builder.with_sink(sink);
        }
        Ok(builder.build())
    }

    /// Audits one intercepted request.
    ///
    /// The request thread only canonicalizes, matches and enqueues; the
    /// formatting already happened by then and delivery is asynchronous.
    /// Returns whether the request was audit-worthy.
    pub fn on_request(&self, request: &RequestContext<'_>) -> bool {
        let canonical = canonicalize(request.path);
        let gate = self.gate.read().clone();
        if !gate.matches(&canonical) {
            return false;
        }

        let enrichment = gate.enrich(&canonical, request.query, self.resolver.as_ref());
        let event = AuditEvent {
            path: format!("{canonical}{}", enrichment.path_suffix),
            extra: enrichment.extra,
            user: request.user.to_string(),
            remote_address: request.remote_address.to_string(),
        };
        debug!(path = %event.path, user = %event.user, "audit-worthy request");
        self.worker.enqueue(event.to_line());
        true
    }

    /// Audits a build lifecycle message, if build cause logging is enabled.
    pub fn on_build_event(&self, message: &str) {
        if self.log_build_cause {
            self.worker.enqueue(message.to_string());
        }
    }

    /// Audits a credential usage message, if enabled.
    pub fn on_credential_usage(&self, message: &str) {
        if self.log_credentials_usage {
            self.worker.enqueue(message.to_string());
        }
    }

    /// Audits a script execution message, if enabled.
    pub fn on_script_usage(&self, message: &str) {
        if self.log_script_usage {
            self.worker.enqueue(message.to_string());
        }
    }

    /// Replaces the active pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern does not compile; the previously
    /// active pattern stays in effect.
    pub fn set_pattern(&self, pattern: &str) -> Result<()> {
        let gate = AuditPatternGate::new(pattern)?;
        *self.gate.write() = Arc::new(gate);
        Ok(())
    }

    /// Returns the active pattern string.
    #[must_use]
    pub fn pattern(&self) -> String {
        self.gate.read().pattern().to_string()
    }

    /// Runs the bypass self-check against the active pattern.
    #[must_use]
    pub fn bypass_warnings(&self) -> Vec<BypassWarning> {
        self.gate.read().bypass_warnings()
    }

    /// Blocks until every previously enqueued event has reached the sinks.
    pub fn flush(&self) {
        self.worker.flush();
    }
}

impl std::fmt::Debug for AuditDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditDispatcher")
            .field("pattern", &self.pattern())
            .finish_non_exhaustive()
    }
}

/// Builder for configuring an [`AuditDispatcher`].
pub struct AuditDispatcherBuilder {
    gate: AuditPatternGate,
    sinks: Vec<Arc<dyn AuditSink>>,
    resolver: Arc<dyn QueueTaskResolver>,
    log_build_cause: bool,
    log_credentials_usage: bool,
    log_script_usage: bool,
}

impl Default for AuditDispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditDispatcherBuilder {
    /// Creates a builder with the default pattern and no sinks.
    #[must_use]
    pub fn new() -> Self {
        Self {
            gate: AuditPatternGate::with_default_pattern(),
            sinks: Vec::new(),
            resolver: Arc::new(NoQueueResolver),
            log_build_cause: true,
            log_credentials_usage: true,
            log_script_usage: true,
        }
    }

    /// Sets the audit pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern does not compile.
    pub fn with_pattern(mut self, pattern: &str) -> Result<Self> {
        self.gate = AuditPatternGate::new(pattern)?;
        Ok(self)
    }

    /// Adds a sink; fan-out follows insertion order.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Sets the queue task resolver used for enrichment.
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn QueueTaskResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Enables or disables build cause logging.
    #[must_use]
    pub const fn log_build_cause(mut self, enabled: bool) -> Self {
        self.log_build_cause = enabled;
        self
    }

    /// Enables or disables credential usage logging.
    #[must_use]
    pub const fn log_credentials_usage(mut self, enabled: bool) -> Self {
        self.log_credentials_usage = enabled;
        self
    }

    /// Enables or disables script usage logging.
    #[must_use]
    pub const fn log_script_usage(mut self, enabled: bool) -> Self {
        self.log_script_usage = enabled;
        self
    }

    /// Builds the dispatcher and spawns its worker.
    #[must_use]
    pub fn build(self) -> AuditDispatcher {
        AuditDispatcher {
            gate: RwLock::new(Arc::new(self.gate)),
            resolver: self.resolver,
            worker: SerialWorker::spawn(self.sinks),
            log_build_cause: self.log_build_cause,
            log_credentials_usage: self.log_credentials_usage,
            log_script_usage: self.log_script_usage,
        }
    }
}
