//! Event dispatch for the Aletheia audit trail platform.
//!
//! The dispatcher is the join point between the host runtime and the
//! configured sinks: intercepted requests are canonicalized, gated against
//! the audit pattern, formatted and handed to a single serial worker that
//! fans them out. Auditing is asynchronous and best-effort relative to the
//! audited action; a broken sink never blocks or fails the host request.
//!
//! # Example
//!
//! ```rust
//! use aletheia_core::{InMemorySink, RequestContext};
//! use aletheia_dispatch::AuditDispatcher;
//! use std::sync::Arc;
//!
//! let sink = Arc::new(InMemorySink::new());
//! let dispatcher = AuditDispatcher::builder().with_sink(sink.clone()).build();
//!
//! dispatcher.on_request(&RequestContext {
//!     path: "/job/test-job/enable",
//!     query: "",
//!     user: "alice",
//!     remote_address: "10.0.0.1",
//! });
//! dispatcher.flush();
//!
//! assert_eq!(sink.events(), vec!["/job/test-job/enable by alice from 10.0.0.1"]);
//! ```

mod dispatcher;
mod sinks;
mod worker;

pub use dispatcher::{AuditDispatcher, AuditDispatcherBuilder};
pub use sinks::build_sinks;
pub use worker::SerialWorker;
