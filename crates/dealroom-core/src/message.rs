//! Canonical chat message types.
//!
//! A conversation has exactly two kinds of author: the customer (`user`)
//! and the `sales_manager` handling the loan. Every inbound record, no
//! matter which naming convention it arrived in, is turned into a
//! [`Message`] by [`crate::normalize`]. Outbound candidates are carried as
//! [`OutboundMessage`] and gated by [`crate::validate`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{MessageId, ParticipantId};
use crate::raw::de_opt_participant;

// ─────────────────────────────────────────────────────────────────────────────
// Sender kind
// ─────────────────────────────────────────────────────────────────────────────

/// Who authored a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderKind {
    /// The customer applying for the loan.
    User,
    /// The bank-side sales manager.
    SalesManager,
}

impl SenderKind {
    /// Every accepted tag, in wire form.
    pub const ALL: [SenderKind; 2] = [SenderKind::User, SenderKind::SalesManager];

    /// Wire tag for this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::SalesManager => "sales_manager",
        }
    }

    /// Parse an exact wire tag. Anything else (including different case) is `None`.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == tag)
    }
}

impl fmt::Display for SenderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Canonical message
// ─────────────────────────────────────────────────────────────────────────────

/// A chat message in canonical form.
///
/// Produced by normalization; never fails to exist, but may lack fields a
/// sendable message requires. See [`crate::validate::is_valid_outbound`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Origin-assigned ID, or the normalization time in epoch milliseconds.
    pub id: MessageId,
    /// Message body. Empty when the raw record had none.
    pub text: String,
    /// Author kind. `None` when the raw tag was missing or unknown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<SenderKind>,
    /// Display name of the author.
    pub name: String,
    /// When the message was sent.
    pub timestamp: DateTime<Utc>,
    /// Author's participant ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<ParticipantId>,
    /// Recipient's participant ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_id: Option<ParticipantId>,
}

impl Message {
    /// Build the outbound candidate for this message.
    #[must_use]
    pub fn to_outbound(&self) -> OutboundMessage {
        OutboundMessage {
            sender_id: self.sender_id.clone(),
            receiver_id: self.receiver_id.clone(),
            text: Some(self.text.clone()),
            sender_type: self.sender.map(|kind| kind.as_str().to_owned()),
            timestamp: Some(self.timestamp),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Outbound candidate
// ─────────────────────────────────────────────────────────────────────────────

/// Payload of an outbound chat message (`sendMessage`).
///
/// Fields are optional and `sender_type` is a free string so that a
/// malformed candidate can still be represented and then rejected by
/// validation instead of failing to parse.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    /// Author's participant ID.
    #[serde(
        default,
        deserialize_with = "de_opt_participant",
        skip_serializing_if = "Option::is_none"
    )]
    pub sender_id: Option<ParticipantId>,
    /// Recipient's participant ID.
    #[serde(
        default,
        deserialize_with = "de_opt_participant",
        skip_serializing_if = "Option::is_none"
    )]
    pub receiver_id: Option<ParticipantId>,
    /// Message body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Author kind tag, unchecked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_type: Option<String>,
    /// Send time, if the author stamped one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Room
// ─────────────────────────────────────────────────────────────────────────────

/// The server-side grouping of one customer and one sales manager.
///
/// Serialized as the `joinRoom` payload: `{"userId": .., "salesManagerId": ..}`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    /// The customer.
    pub user_id: ParticipantId,
    /// The customer's sales manager.
    pub sales_manager_id: ParticipantId,
}

impl Room {
    /// Room of `user_id` and `sales_manager_id`.
    #[must_use]
    pub fn new(user_id: impl Into<ParticipantId>, sales_manager_id: impl Into<ParticipantId>) -> Self {
        Self {
            user_id: user_id.into(),
            sales_manager_id: sales_manager_id.into(),
        }
    }

    /// Room joined by `self_id`, speaking as `role`, with `counterpart_id`.
    ///
    /// Both sides of a conversation derive the same room.
    #[must_use]
    pub fn for_participant(
        role: SenderKind,
        self_id: impl Into<ParticipantId>,
        counterpart_id: impl Into<ParticipantId>,
    ) -> Self {
        match role {
            SenderKind::User => Self::new(self_id, counterpart_id),
            SenderKind::SalesManager => Self::new(counterpart_id, self_id),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn sample() -> Message {
        Message {
            id: MessageId::from("42"),
            text: "hello".into(),
            sender: Some(SenderKind::SalesManager),
            name: "Priya".into(),
            timestamp: Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap(),
            sender_id: Some(ParticipantId::from("m-1")),
            receiver_id: Some(ParticipantId::from("u-1")),
        }
    }

    #[test]
    fn sender_kind_tags() {
        assert_eq!(SenderKind::User.as_str(), "user");
        assert_eq!(SenderKind::SalesManager.as_str(), "sales_manager");
        assert_eq!(SenderKind::from_tag("sales_manager"), Some(SenderKind::SalesManager));
        assert_eq!(SenderKind::from_tag("admin"), None);
        assert_eq!(SenderKind::from_tag("User"), None);
    }

    #[test]
    fn sender_kind_serializes_snake_case() {
        let json = serde_json::to_string(&SenderKind::SalesManager).unwrap();
        assert_eq!(json, "\"sales_manager\"");
    }

    #[test]
    fn room_for_either_side_is_the_same_room() {
        let from_user = Room::for_participant(SenderKind::User, "u-1", "m-1");
        let from_manager = Room::for_participant(SenderKind::SalesManager, "m-1", "u-1");
        assert_eq!(from_user, from_manager);
        assert_eq!(
            serde_json::to_value(&from_manager).unwrap(),
            json!({"userId": "u-1", "salesManagerId": "m-1"})
        );
    }

    #[test]
    fn message_serializes_camel_case() {
        let v = serde_json::to_value(sample()).unwrap();
        assert_eq!(v["senderId"], "m-1");
        assert_eq!(v["receiverId"], "u-1");
        assert_eq!(v["sender"], "sales_manager");
        assert_eq!(v["timestamp"], "2025-03-01T09:30:00Z");
    }

    #[test]
    fn message_omits_missing_participants() {
        let mut msg = sample();
        msg.sender_id = None;
        msg.sender = None;
        let v = serde_json::to_value(msg).unwrap();
        assert!(v.get("senderId").is_none());
        assert!(v.get("sender").is_none());
    }

    #[test]
    fn to_outbound_carries_tag_and_ids() {
        let out = sample().to_outbound();
        assert_eq!(out.sender_type.as_deref(), Some("sales_manager"));
        assert_eq!(out.sender_id, Some(ParticipantId::from("m-1")));
        assert_eq!(out.text.as_deref(), Some("hello"));
    }

    #[test]
    fn outbound_accepts_numeric_ids() {
        let out: OutboundMessage = serde_json::from_value(json!({
            "senderId": 12,
            "receiverId": "b",
            "text": "hi",
            "senderType": "user"
        }))
        .unwrap();
        assert_eq!(out.sender_id, Some(ParticipantId::from("12")));
    }

    #[test]
    fn room_payload_shape() {
        let v = serde_json::to_value(Room::new("u-1", "m-1")).unwrap();
        assert_eq!(v, json!({"userId": "u-1", "salesManagerId": "m-1"}));
    }
}
