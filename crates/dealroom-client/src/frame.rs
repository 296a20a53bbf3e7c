//! Wire envelope.
//!
//! Every WebSocket text frame carries exactly one named event:
//!
//! ```json
//! {"event": "sendMessage", "data": {"senderId": "u-1", "text": "hi"}}
//! ```
//!
//! `data` may be omitted, in which case it reads as `null`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TransportError;

/// Event names exchanged with the realtime server.
pub mod events {
    /// Connection established (local).
    pub const CONNECT: &str = "connect";
    /// Connection lost or closed (local).
    pub const DISCONNECT: &str = "disconnect";
    /// Connection could not be established (local).
    pub const CONNECT_ERROR: &str = "connect_error";
    /// Announce room membership; payload is a `Room`.
    pub const JOIN_ROOM: &str = "joinRoom";
    /// Outbound chat message.
    pub const SEND_MESSAGE: &str = "sendMessage";
    /// Inbound chat message.
    pub const RECEIVE_MESSAGE: &str = "receiveMessage";
}

/// One event on the wire.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Event name.
    pub event: String,
    /// Event payload.
    #[serde(default)]
    pub data: Value,
}

impl Frame {
    /// Frame for `event` carrying `data`.
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Encode as frame text.
    pub fn encode(&self) -> Result<String, TransportError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode frame text.
    pub fn decode(text: &str) -> Result<Self, TransportError> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn encodes_envelope() {
        let frame = Frame::new(events::JOIN_ROOM, json!({"userId": "u", "salesManagerId": "m"}));
        let v: Value = serde_json::from_str(&frame.encode().unwrap()).unwrap();
        assert_eq!(v, json!({"event": "joinRoom", "data": {"userId": "u", "salesManagerId": "m"}}));
    }

    #[test]
    fn missing_data_is_null() {
        let frame = Frame::decode(r#"{"event": "ping"}"#).unwrap();
        assert_eq!(frame.event, "ping");
        assert_eq!(frame.data, Value::Null);
    }

    #[test]
    fn rejects_frames_without_event() {
        assert_matches!(Frame::decode(r#"{"data": 1}"#), Err(TransportError::Codec(_)));
        assert_matches!(Frame::decode("not json"), Err(TransportError::Codec(_)));
        assert_matches!(Frame::decode(r#"{"event": 7}"#), Err(TransportError::Codec(_)));
    }
}
