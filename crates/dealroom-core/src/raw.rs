//! Raw message records as they arrive from the wire or the database.
//!
//! Two naming conventions exist for the same message:
//!
//! | concept      | wire (camelCase) | persisted (snake_case) |
//! |--------------|------------------|------------------------|
//! | sender       | `senderId`       | `sender_id`            |
//! | receiver     | `receiverId`     | `receiver_id`          |
//! | body         | `text`           | `message_text`         |
//! | sender kind  | `senderType`     | `sender_type`          |
//! | send time    | `timestamp`      | `sent_at`              |
//!
//! [`RawMessage`] flattens one struct per convention so the resolution
//! order (wire, then persisted) is written once in [`RawMessage`]'s
//! accessors rather than probed field-by-field at runtime.
//!
//! Every field deserializes leniently: a value of the wrong JSON type is
//! treated as absent instead of failing the whole record.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::errors::Result;
use crate::ids::{MessageId, ParticipantId};

/// Fields named the way the realtime server sends them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireFields {
    /// Message ID (shared by both conventions).
    #[serde(default, deserialize_with = "de_lenient_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Author's participant ID.
    #[serde(default, deserialize_with = "de_lenient_id", skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    /// Recipient's participant ID.
    #[serde(default, deserialize_with = "de_lenient_id", skip_serializing_if = "Option::is_none")]
    pub receiver_id: Option<String>,
    /// Message body.
    #[serde(default, deserialize_with = "de_lenient_string", skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Author kind tag.
    #[serde(default, deserialize_with = "de_lenient_string", skip_serializing_if = "Option::is_none")]
    pub sender_type: Option<String>,
    /// Send time.
    #[serde(default, deserialize_with = "de_lenient_time", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Fields named the way the `messages` table stores them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PersistedFields {
    /// Author's participant ID.
    #[serde(default, deserialize_with = "de_lenient_id", skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    /// Recipient's participant ID.
    #[serde(default, deserialize_with = "de_lenient_id", skip_serializing_if = "Option::is_none")]
    pub receiver_id: Option<String>,
    /// Message body.
    #[serde(default, deserialize_with = "de_lenient_string", skip_serializing_if = "Option::is_none")]
    pub message_text: Option<String>,
    /// Author kind tag.
    #[serde(default, deserialize_with = "de_lenient_string", skip_serializing_if = "Option::is_none")]
    pub sender_type: Option<String>,
    /// Send time.
    #[serde(default, deserialize_with = "de_lenient_time", skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
}

/// A raw message record carrying any subset of both conventions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMessage {
    /// Wire-convention fields.
    #[serde(flatten)]
    pub wire: WireFields,
    /// Persisted-convention fields.
    #[serde(flatten)]
    pub persisted: PersistedFields,
}

impl RawMessage {
    /// Read a raw record from an untyped JSON value.
    ///
    /// Anything that is not a JSON object reads as an empty record.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        if !value.is_object() {
            return Self::default();
        }
        Self::deserialize(value).unwrap_or_default()
    }

    /// Strictly parse one JSON object.
    ///
    /// Field values are still read leniently; only malformed JSON or a
    /// non-object top level is an error.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Strictly parse a JSON array of records, e.g. a conversation export.
    pub fn list_from_json(text: &str) -> Result<Vec<Self>> {
        Ok(serde_json::from_str(text)?)
    }

    /// Origin-assigned message ID.
    #[must_use]
    pub fn id(&self) -> Option<MessageId> {
        present(self.wire.id.as_ref()).map(|s| MessageId::from(s.as_str()))
    }

    /// Author ID: wire first, then persisted.
    #[must_use]
    pub fn sender_id(&self) -> Option<ParticipantId> {
        present(self.wire.sender_id.as_ref())
            .or_else(|| present(self.persisted.sender_id.as_ref()))
            .map(|s| ParticipantId::from(s.as_str()))
    }

    /// Recipient ID: wire first, then persisted.
    #[must_use]
    pub fn receiver_id(&self) -> Option<ParticipantId> {
        present(self.wire.receiver_id.as_ref())
            .or_else(|| present(self.persisted.receiver_id.as_ref()))
            .map(|s| ParticipantId::from(s.as_str()))
    }

    /// Body: wire first, then persisted.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        present(self.wire.text.as_ref())
            .or_else(|| present(self.persisted.message_text.as_ref()))
            .map(String::as_str)
    }

    /// Author kind tag: wire first, then persisted.
    #[must_use]
    pub fn sender_type(&self) -> Option<&str> {
        present(self.wire.sender_type.as_ref())
            .or_else(|| present(self.persisted.sender_type.as_ref()))
            .map(String::as_str)
    }

    /// Send time: wire first, then persisted.
    #[must_use]
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.wire.timestamp.or(self.persisted.sent_at)
    }
}

/// Empty strings count as missing, so an empty wire field falls through
/// to its persisted counterpart.
fn present(value: Option<&String>) -> Option<&String> {
    value.filter(|s| !s.is_empty())
}

// ─────────────────────────────────────────────────────────────────────────────
// Lenient field deserializers
// ─────────────────────────────────────────────────────────────────────────────

/// Identifier rendered as a string. Database rows carry integer keys;
/// a numeric zero is falsy on the wire and reads as absent.
fn id_from_value(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) if n.as_f64().is_some_and(|f| f != 0.0) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse a timestamp from RFC 3339 text, SQL `YYYY-MM-DD HH:MM:SS[.fff]`
/// text (read as UTC), or epoch milliseconds.
fn time_from_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_time_text(s),
        Value::Number(n) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        _ => None,
    }
}

fn parse_time_text(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn de_lenient_id<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(id_from_value))
}

fn de_lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}

fn de_lenient_time<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?
        .as_ref()
        .and_then(time_from_value))
}

/// Participant ID accepting a string or an integer.
pub(crate) fn de_opt_participant<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<ParticipantId>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(de_lenient_id(deserializer)?.map(ParticipantId::from_string))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
