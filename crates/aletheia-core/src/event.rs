//! Audit event model.
//!
//! Events are ephemeral: one is built per matched request, rendered into a
//! single line, handed to the sinks and discarded.

/// Context captured synchronously on the request thread.
///
/// Only these four strings are taken from the intercepted request; everything
/// else (formatting, fan-out) happens off the request path.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext<'a> {
    /// Raw (not yet canonicalized) request path.
    pub path: &'a str,

    /// Raw query string without the leading `?`.
    pub query: &'a str,

    /// Identifier of the acting user, `"?"` when anonymous.
    pub user: &'a str,

    /// Remote address the request came from.
    pub remote_address: &'a str,
}

/// A single audit-worthy event, ready to be formatted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    /// Canonicalized path, including any enrichment suffix.
    pub path: String,

    /// Endpoint-specific extra information, empty for most paths.
    pub extra: String,

    /// Identifier of the acting user.
    pub user: String,

    /// Remote address the request came from.
    pub remote_address: String,
}

impl AuditEvent {
    /// Renders the event into its audit line:
    /// `"<path><extra> by <user> from <remoteAddress>"`.
    #[must_use]
    pub fn to_line(&self) -> String {
        format!(
            "{}{} by {} from {}",
            self.path, self.extra, self.user, self.remote_address
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_line_format() {
        let event = AuditEvent {
            path: "/job/test-job/enable".to_string(),
            extra: String::new(),
            user: "alice".to_string(),
            remote_address: "10.0.0.1".to_string(),
        };
        assert_eq!(
            event.to_line(),
            "/job/test-job/enable by alice from 10.0.0.1"
        );
    }

    #[test]
    fn test_event_line_with_extra() {
        let event = AuditEvent {
            path: "/createItem".to_string(),
            extra: " (Job With Space)".to_string(),
            user: "bob".to_string(),
            remote_address: "192.168.0.3".to_string(),
        };
        assert_eq!(
            event.to_line(),
            "/createItem (Job With Space) by bob from 192.168.0.3"
        );
    }
}
