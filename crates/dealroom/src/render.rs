//! Terminal rendering of chat messages.

use dealroom_core::{ClockStyle, Message, Normalizer, RawMessage, humanize};

/// One printable line: `[<when>] <name>: <text>`.
pub fn format_line(message: &Message, normalizer: &Normalizer, style: ClockStyle) -> String {
    let when = humanize(message.timestamp, normalizer.clock().as_ref(), style);
    format!("[{when}] {}: {}", message.name, message.text)
}

/// Render a saved conversation: a JSON array of raw message records.
///
/// Records are normalized in file order; missing fields take the usual
/// defaults. Anything but an array of objects is an error.
pub fn render_history(
    json: &str,
    normalizer: &Normalizer,
    name: Option<&str>,
    style: ClockStyle,
) -> dealroom_core::Result<Vec<String>> {
    let records = RawMessage::list_from_json(json)?;
    Ok(records
        .iter()
        .map(|raw| format_line(&normalizer.normalize(raw, name), normalizer, style))
        .collect())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use assert_matches::assert_matches;
    use dealroom_core::{CoreError, FixedClock};

    const NOW_MS: i64 = 1_735_689_600_000;

    fn normalizer() -> Normalizer {
        Normalizer::new(Arc::new(FixedClock::at_millis(NOW_MS)))
    }

    #[test]
    fn recent_message_line() {
        let n = normalizer();
        let msg = n.normalize_value(
            &serde_json::json!({"text": "EMI schedule attached", "senderType": "sales_manager"}),
            Some("Ravi"),
        );
        assert_eq!(
            format_line(&msg, &n, ClockStyle::TwelveHour),
            "[Just now] Ravi: EMI schedule attached"
        );
    }

    #[test]
    fn history_renders_in_order() {
        let n = normalizer();
        let json = r#"[
            {"message_text": "first", "sent_at": "2024-12-31T23:55:00Z"},
            {"text": "second", "timestamp": "2024-12-31T22:00:00Z"}
        ]"#;
        let lines = render_history(json, &n, Some("Asha"), ClockStyle::TwentyFourHour).unwrap();
        assert_eq!(
            lines,
            vec![
                "[5 minutes ago] Asha: first".to_owned(),
                "[2 hours ago] Asha: second".to_owned(),
            ]
        );
    }

    #[test]
    fn history_must_be_json_array() {
        let n = normalizer();
        assert_matches!(
            render_history("{not json", &n, None, ClockStyle::default()),
            Err(CoreError::Json(_))
        );
    }
}
