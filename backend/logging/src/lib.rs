//! Telemetry and structured logging for chatloom.
//!
//! Console output goes to stderr so it never interleaves with the
//! conversation on stdout; an optional rolling NDJSON file captures the same
//! events. Chat events are redacted before they reach any sink.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{ChatEvent, ChatEventLogger, EventLogEntry};
pub use logger::{init_logger, LOG_FILE_PREFIX};
pub use redact::redact_sensitive_data;
