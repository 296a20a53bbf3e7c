//! Raw record → canonical [`Message`].
//!
//! Normalization never fails. Each field resolves wire → persisted →
//! default, where the defaults are:
//!
//! - `id`: the clock reading in epoch milliseconds
//! - `name`: the caller's display name, else [`UNKNOWN_SENDER_NAME`]
//! - `timestamp`: the clock reading
//!
//! Participant IDs are never invented; a record without them normalizes to
//! a message without them.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::constants::UNKNOWN_SENDER_NAME;
use crate::ids::MessageId;
use crate::message::{Message, SenderKind};
use crate::raw::RawMessage;

/// Normalize a raw record against `clock`.
///
/// `name` is the display name the caller knows for the author; `None` or an
/// empty name falls back to [`UNKNOWN_SENDER_NAME`].
#[must_use]
pub fn normalize_message(raw: &RawMessage, name: Option<&str>, clock: &dyn Clock) -> Message {
    normalize_with_default_name(raw, name, UNKNOWN_SENDER_NAME, clock)
}

fn normalize_with_default_name(
    raw: &RawMessage,
    name: Option<&str>,
    default_name: &str,
    clock: &dyn Clock,
) -> Message {
    // One clock reading backs both defaults so they agree with each other.
    let now = clock.now();

    let sender = raw.sender_type().and_then(|tag| {
        let kind = SenderKind::from_tag(tag);
        if kind.is_none() {
            debug!(tag, "unknown sender type on inbound message");
        }
        kind
    });

    Message {
        id: raw
            .id()
            .unwrap_or_else(|| MessageId::from_millis(now.timestamp_millis())),
        text: raw.text().unwrap_or_default().to_owned(),
        sender,
        name: name
            .filter(|n| !n.is_empty())
            .unwrap_or(default_name)
            .to_owned(),
        timestamp: raw.timestamp().unwrap_or(now),
        sender_id: raw.sender_id(),
        receiver_id: raw.receiver_id(),
    }
}

/// Normalizer bound to a clock and a fallback display name.
///
/// Cheap to clone; hand one to every component that turns inbound
/// payloads into messages.
#[derive(Clone, Debug)]
pub struct Normalizer {
    clock: Arc<dyn Clock>,
    default_name: String,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl Normalizer {
    /// Normalizer reading time from `clock`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            default_name: UNKNOWN_SENDER_NAME.to_owned(),
        }
    }

    /// Replace the display name used when none is supplied.
    #[must_use]
    pub fn with_default_name(mut self, name: impl Into<String>) -> Self {
        self.default_name = name.into();
        self
    }

    /// The clock this normalizer reads.
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Normalize a typed raw record.
    #[must_use]
    pub fn normalize(&self, raw: &RawMessage, name: Option<&str>) -> Message {
        normalize_with_default_name(raw, name, &self.default_name, self.clock.as_ref())
    }

    /// Normalize an untyped payload, e.g. the data of a `receiveMessage` event.
    #[must_use]
    pub fn normalize_value(&self, value: &Value, name: Option<&str>) -> Message {
        self.normalize(&RawMessage::from_value(value), name)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
