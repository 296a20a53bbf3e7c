//! Outbound message validation.
//!
//! A candidate is sendable when, checked in this order:
//!
//! 1. it is a JSON object,
//! 2. sender ID, receiver ID, text, and sender type are all present and non-empty,
//! 3. the sender type is one of [`SenderKind::ALL`],
//! 4. the text is a string with non-whitespace content.
//!
//! The verdict is a plain `bool`. The first failing rule is logged at
//! `debug` and otherwise discarded.

use serde_json::Value;
use tracing::debug;

use crate::message::{OutboundMessage, SenderKind};

/// Why a candidate was refused. Internal; callers only see `false`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Rejection {
    NotAnObject,
    MissingSenderId,
    MissingReceiverId,
    MissingText,
    MissingSenderType,
    UnknownSenderType,
    TextNotAString,
    BlankText,
}

/// Validate an untyped candidate. Never panics, never errors.
#[must_use]
pub fn is_valid_message(candidate: &Value) -> bool {
    verdict(check_value(candidate))
}

/// Validate a typed candidate.
#[must_use]
pub fn is_valid_outbound(candidate: &OutboundMessage) -> bool {
    verdict(check_outbound(candidate))
}

fn verdict(result: Result<(), Rejection>) -> bool {
    match result {
        Ok(()) => true,
        Err(reason) => {
            debug!(?reason, "outbound message rejected");
            false
        }
    }
}

fn check_value(candidate: &Value) -> Result<(), Rejection> {
    let Some(fields) = candidate.as_object() else {
        return Err(Rejection::NotAnObject);
    };

    if !fields.get("senderId").is_some_and(is_truthy) {
        return Err(Rejection::MissingSenderId);
    }
    if !fields.get("receiverId").is_some_and(is_truthy) {
        return Err(Rejection::MissingReceiverId);
    }
    if !fields.get("text").is_some_and(is_truthy) {
        return Err(Rejection::MissingText);
    }
    if !fields.get("senderType").is_some_and(is_truthy) {
        return Err(Rejection::MissingSenderType);
    }
    if !fields
        .get("senderType")
        .and_then(Value::as_str)
        .is_some_and(|tag| SenderKind::from_tag(tag).is_some())
    {
        return Err(Rejection::UnknownSenderType);
    }
    match fields.get("text") {
        Some(Value::String(text)) if !text.trim().is_empty() => Ok(()),
        Some(Value::String(_)) => Err(Rejection::BlankText),
        _ => Err(Rejection::TextNotAString),
    }
}

fn check_outbound(candidate: &OutboundMessage) -> Result<(), Rejection> {
    if !candidate.sender_id.as_ref().is_some_and(|id| !id.is_empty()) {
        return Err(Rejection::MissingSenderId);
    }
    if !candidate.receiver_id.as_ref().is_some_and(|id| !id.is_empty()) {
        return Err(Rejection::MissingReceiverId);
    }
    let Some(text) = candidate.text.as_deref().filter(|t| !t.is_empty()) else {
        return Err(Rejection::MissingText);
    };
    let Some(tag) = candidate.sender_type.as_deref().filter(|t| !t.is_empty()) else {
        return Err(Rejection::MissingSenderType);
    };
    if SenderKind::from_tag(tag).is_none() {
        return Err(Rejection::UnknownSenderType);
    }
    if text.trim().is_empty() {
        return Err(Rejection::BlankText);
    }
    Ok(())
}

/// JSON truthiness: `null`, `false`, `0`, and `""` are falsy; everything
/// else (including empty arrays and objects) is truthy.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ParticipantId;
    use crate::logging::capture_logs;
    use serde_json::json;

    fn good() -> Value {
        json!({"senderId": "a", "receiverId": "b", "text": "hi", "senderType": "user"})
    }

    #[test]
    fn accepts_minimal_valid_message() {
        assert!(is_valid_message(&good()));
    }

    #[test]
    fn accepts_sales_manager() {
        let mut v = good();
        v["senderType"] = json!("sales_manager");
        assert!(is_valid_message(&v));
    }

    #[test]
    fn rejects_null_and_non_objects() {
        assert!(!is_valid_message(&Value::Null));
        assert!(!is_valid_message(&json!("hi")));
        assert!(!is_valid_message(&json!([good()])));
    }

    #[test]
    fn rejects_empty_object() {
        assert!(!is_valid_message(&json!({})));
    }

    #[test]
    fn rejects_missing_text() {
        let mut v = good();
        let _ = v.as_object_mut().unwrap().remove("text");
        assert!(!is_valid_message(&v));
    }

    #[test]
    fn rejects_unknown_sender_type() {
        let mut v = good();
        v["senderType"] = json!("admin");
        assert!(!is_valid_message(&v));
    }

    #[test]
    fn rejects_whitespace_only_text() {
        let mut v = good();
        v["text"] = json!("   ");
        assert!(!is_valid_message(&v));
    }

    #[test]
    fn rejects_non_string_text() {
        let mut v = good();
        v["text"] = json!(42);
        assert!(!is_valid_message(&v));
    }

    #[test]
    fn rejects_falsy_participants() {
        for key in ["senderId", "receiverId"] {
            for falsy in [json!(""), json!(0), json!(null), json!(false)] {
                let mut v = good();
                v[key] = falsy;
                assert!(!is_valid_message(&v), "{key} should be required");
            }
        }
    }

    #[test]
    fn numeric_participant_ids_are_truthy() {
        let mut v = good();
        v["senderId"] = json!(17);
        assert!(is_valid_message(&v));
    }

    #[test]
    fn typed_path_agrees() {
        let mut out = OutboundMessage {
            sender_id: Some(ParticipantId::from("a")),
            receiver_id: Some(ParticipantId::from("b")),
            text: Some("hi".into()),
            sender_type: Some("user".into()),
            timestamp: None,
        };
        assert!(is_valid_outbound(&out));

        out.text = Some("  \t ".into());
        assert!(!is_valid_outbound(&out));

        out.text = Some("hi".into());
        out.sender_type = Some("admin".into());
        assert!(!is_valid_outbound(&out));

        out.sender_type = Some("user".into());
        out.receiver_id = None;
        assert!(!is_valid_outbound(&out));

        assert!(!is_valid_outbound(&OutboundMessage::default()));
    }

    #[test]
    fn zero_participant_rejected_on_both_paths() {
        use crate::clock::FixedClock;
        use crate::normalize::normalize_message;
        use crate::raw::RawMessage;

        let payload = json!({"senderId": 0, "receiverId": "m-1", "text": "hi", "senderType": "user"});
        assert!(!is_valid_message(&payload));

        let clock = FixedClock::at_millis(1_735_689_600_000);
        let message = normalize_message(&RawMessage::from_value(&payload), None, &clock);
        assert_eq!(message.sender_id, None);
        assert!(!is_valid_outbound(&message.to_outbound()));
    }

    #[test]
    fn first_failing_rule_is_logged() {
        let (logs, _guard) = capture_logs();
        let _ = is_valid_message(&json!({"receiverId": "b"}));
        let events = logs.events();
        assert_eq!(events.len(), 1);
        assert!(events[0].message.contains("outbound message rejected"));
        assert!(
            events[0]
                .fields
                .iter()
                .any(|(k, v)| k == "reason" && v == "MissingSenderId")
        );
    }
}
