//! Chat Event Logger
//!
//! Structured session events (priming, turn, backend failure, end) emitted
//! under the `chat_events` target, which the JSON file layer writes as NDJSON.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::redact::redact_sensitive_data;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ChatEvent {
    Priming {
        completion_len: usize,
        latency_ms: u64,
    },
    Turn {
        user_input: String,
        completion: String,
        history_len: usize,
        latency_ms: u64,
    },
    BackendFailure {
        provider: String,
        error_msg: String,
    },
    SessionEnded {
        turns: usize,
        backend_calls: usize,
        failed_calls: usize,
    },
}

#[derive(Debug, Serialize)]
pub struct EventLogEntry {
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub event: ChatEvent,
}

impl EventLogEntry {
    fn new(session_id: &str, event: ChatEvent) -> Self {
        Self {
            session_id: session_id.into(),
            timestamp: Utc::now(),
            event: redact_event(event),
        }
    }
}

pub struct ChatEventLogger;

impl ChatEventLogger {
    /// Redact and emit a session event.
    pub fn log_event(session_id: &str, event: ChatEvent) {
        let entry = EventLogEntry::new(session_id, event);
        let json = serde_json::to_string(&entry).unwrap_or_default();
        info!(target: "chat_events", session_id = %entry.session_id, event = %json, "Chat event");
    }
}

fn redact_event(mut event: ChatEvent) -> ChatEvent {
    match &mut event {
        ChatEvent::Turn {
            user_input,
            completion,
            ..
        } => {
            *user_input = redact_sensitive_data(user_input);
            *completion = redact_sensitive_data(completion);
        }
        ChatEvent::BackendFailure { error_msg, .. } => {
            *error_msg = redact_sensitive_data(error_msg);
        }
        ChatEvent::Priming { .. } | ChatEvent::SessionEnded { .. } => {}
    }
    event
}
