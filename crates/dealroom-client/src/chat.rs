//! Chat-level wrapper over a [`SessionClient`].
//!
//! Outbound messages pass validation before they are emitted as
//! `sendMessage`; inbound `receiveMessage` payloads are normalized before
//! reaching the caller.

use dealroom_core::{
    Message, MessageId, Normalizer, ParticipantId, Room, SenderKind, is_valid_outbound,
};
use tracing::debug;

use crate::frame::events;
use crate::session::{ConnectionHandle, HandlerId, SessionClient};

/// One participant's side of a conversation.
#[derive(Debug)]
pub struct ChatSession {
    client: SessionClient,
    normalizer: Normalizer,
    self_id: ParticipantId,
    counterpart_id: ParticipantId,
    role: SenderKind,
    self_name: Option<String>,
    counterpart_name: Option<String>,
}

impl ChatSession {
    /// Chat between `self_id` (acting as `role`) and `counterpart_id`.
    pub fn new(
        client: SessionClient,
        normalizer: Normalizer,
        self_id: impl Into<ParticipantId>,
        counterpart_id: impl Into<ParticipantId>,
        role: SenderKind,
    ) -> Self {
        Self {
            client,
            normalizer,
            self_id: self_id.into(),
            counterpart_id: counterpart_id.into(),
            role,
            self_name: None,
            counterpart_name: None,
        }
    }

    /// Display name for this participant's own messages.
    #[must_use]
    pub fn with_self_name(mut self, name: impl Into<String>) -> Self {
        self.self_name = Some(name.into());
        self
    }

    /// Display name for the counterpart's messages.
    #[must_use]
    pub fn with_counterpart_name(mut self, name: impl Into<String>) -> Self {
        self.counterpart_name = Some(name.into());
        self
    }

    /// The underlying session client.
    pub fn client(&self) -> &SessionClient {
        &self.client
    }

    /// Mutable access, e.g. to [`SessionClient::subscribe`] before opening.
    pub fn client_mut(&mut self) -> &mut SessionClient {
        &mut self.client
    }

    /// Which side of the conversation this session speaks for.
    pub fn role(&self) -> SenderKind {
        self.role
    }

    /// The room this session joins. The customer is always `userId`,
    /// whichever side opens it.
    pub fn room(&self) -> Room {
        Room::for_participant(
            self.role,
            self.self_id.clone(),
            self.counterpart_id.clone(),
        )
    }

    /// Connect and join the room with the counterpart.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn open(&mut self) -> ConnectionHandle {
        let room = self.room();
        self.client.join(self.self_id.clone(), room)
    }

    /// Leave the room and close the connection. Idempotent.
    pub fn close(&mut self) {
        self.client.disconnect();
    }

    /// Build an outgoing message from this participant, stamped now.
    pub fn compose(&self, text: impl Into<String>) -> Message {
        let now = self.normalizer.clock().now();
        Message {
            id: MessageId::from_millis(now.timestamp_millis()),
            text: text.into(),
            sender: Some(self.role),
            name: self
                .self_name
                .clone()
                .unwrap_or_else(|| dealroom_core::constants::UNKNOWN_SENDER_NAME.to_owned()),
            timestamp: now,
            sender_id: Some(self.self_id.clone()),
            receiver_id: Some(self.counterpart_id.clone()),
        }
    }

    /// Validate `message` and emit it as `sendMessage`.
    ///
    /// Returns whether the message passed validation. Delivery itself is
    /// best effort: while disconnected a valid message is dropped.
    pub fn send(&self, message: &Message) -> bool {
        let outbound = message.to_outbound();
        if !is_valid_outbound(&outbound) {
            debug!(message_id = %message.id, "not sending invalid message");
            return false;
        }
        self.client.emit(events::SEND_MESSAGE, &outbound);
        true
    }

    /// Call `callback` with every inbound chat message, normalized.
    ///
    /// Messages authored by this participant get its display name; all
    /// others get the counterpart's. The callback survives reconnects and
    /// may be registered before [`ChatSession::open`].
    pub fn on_message<F>(&mut self, callback: F) -> HandlerId
    where
        F: Fn(Message) + Send + Sync + 'static,
    {
        let normalizer = self.normalizer.clone();
        let self_id = self.self_id.clone();
        let own_name = self.self_name.clone();
        let other_name = self.counterpart_name.clone();

        self.client.subscribe(events::RECEIVE_MESSAGE, move |payload| {
            let mut message = normalizer.normalize_value(payload, None);
            let name = if message.sender_id.as_ref() == Some(&self_id) {
                &own_name
            } else {
                &other_name
            };
            if let Some(name) = name.as_deref().filter(|n| !n.is_empty()) {
                name.clone_into(&mut message.name);
            }
            callback(message);
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::transport::memory::{MemoryListener, MemoryTransport};
    use dealroom_core::FixedClock;
    use parking_lot::Mutex;
    use serde_json::json;
    use tokio::time::timeout;

    const TIMEOUT: Duration = Duration::from_secs(2);
    const NOW_MS: i64 = 1_735_689_600_000;

    fn chat() -> (ChatSession, MemoryListener) {
        let (transport, listener) = MemoryTransport::new();
        let client = SessionClient::new("mem://chat", Arc::new(transport));
        let normalizer = Normalizer::new(Arc::new(FixedClock::at_millis(NOW_MS)));
        let session = ChatSession::new(client, normalizer, "u-1", "m-1", SenderKind::User)
            .with_self_name("Asha")
            .with_counterpart_name("Ravi");
        (session, listener)
    }

    fn manager_chat() -> (ChatSession, MemoryListener) {
        let (transport, listener) = MemoryTransport::new();
        let client = SessionClient::new("mem://chat", Arc::new(transport));
        let normalizer = Normalizer::new(Arc::new(FixedClock::at_millis(NOW_MS)));
        let session =
            ChatSession::new(client, normalizer, "m-1", "u-1", SenderKind::SalesManager)
                .with_self_name("Ravi");
        (session, listener)
    }

    #[test]
    fn compose_stamps_participants_and_clock() {
        let (session, _l) = chat();
        let msg = session.compose("When is disbursement?");
        assert_eq!(msg.id, MessageId::from_millis(NOW_MS));
        assert_eq!(msg.sender, Some(SenderKind::User));
        assert_eq!(msg.name, "Asha");
        assert_eq!(msg.sender_id, Some(ParticipantId::from("u-1")));
        assert_eq!(msg.receiver_id, Some(ParticipantId::from("m-1")));
        assert_eq!(msg.timestamp.timestamp_millis(), NOW_MS);
    }

    #[tokio::test]
    async fn open_joins_and_send_emits() {
        let (mut session, mut listener) = chat();
        let handle = session.open();
        assert!(timeout(TIMEOUT, handle.connected()).await.unwrap());
        let mut peer = listener.accept().await.unwrap();

        let join = peer.recv().await.unwrap();
        assert_eq!(join.event, events::JOIN_ROOM);
        assert_eq!(join.data, json!({"userId": "u-1", "salesManagerId": "m-1"}));

        assert!(session.send(&session.compose("hello")));
        let sent = timeout(TIMEOUT, peer.recv()).await.unwrap().unwrap();
        assert_eq!(sent.event, events::SEND_MESSAGE);
        assert_eq!(sent.data["senderId"], "u-1");
        assert_eq!(sent.data["receiverId"], "m-1");
        assert_eq!(sent.data["senderType"], "user");
        assert_eq!(sent.data["text"], "hello");
    }

    #[tokio::test]
    async fn invalid_messages_are_not_sent() {
        let (mut session, mut listener) = chat();
        let handle = session.open();
        assert!(timeout(TIMEOUT, handle.connected()).await.unwrap());
        let mut peer = listener.accept().await.unwrap();
        let _join = peer.recv().await.unwrap();

        assert!(!session.send(&session.compose("   ")));
        let mut no_receiver = session.compose("hi");
        no_receiver.receiver_id = None;
        assert!(!session.send(&no_receiver));

        session.close();
        assert!(timeout(TIMEOUT, peer.recv()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn valid_message_while_closed_is_accepted_but_dropped() {
        let (session, _l) = chat();
        assert!(session.send(&session.compose("hello")));
        assert!(!session.client().is_connected());
    }

    #[tokio::test]
    async fn inbound_messages_are_normalized_and_named() {
        let (mut session, mut listener) = chat();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _ = session.on_message(move |m| sink.lock().push(m));
        let handle = session.open();
        assert!(timeout(TIMEOUT, handle.connected()).await.unwrap());

        let peer = listener.accept().await.unwrap();
        assert!(
            peer.send(
                events::RECEIVE_MESSAGE,
                json!({"sender_id": 44, "receiver_id": "u-1", "message_text": "Docs received", "sender_type": "sales_manager", "sent_at": "2025-01-01 00:00:00"}),
            )
            .await
        );
        assert!(
            peer.send(
                events::RECEIVE_MESSAGE,
                json!({"senderId": "u-1", "receiverId": "m-1", "text": "thanks", "senderType": "user"}),
            )
            .await
        );

        timeout(TIMEOUT, async {
            while seen.lock().len() < 2 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        let seen = seen.lock();
        assert_eq!(seen[0].text, "Docs received");
        assert_eq!(seen[0].sender, Some(SenderKind::SalesManager));
        assert_eq!(seen[0].sender_id, Some(ParticipantId::from("44")));
        assert_eq!(seen[0].name, "Ravi");
        assert_eq!(seen[1].name, "Asha");
        assert_eq!(seen[1].timestamp.timestamp_millis(), NOW_MS);
    }

    #[tokio::test]
    async fn sales_manager_joins_the_customers_room() {
        let (mut session, mut listener) = manager_chat();
        assert_eq!(session.room(), Room::new("u-1", "m-1"));
        let handle = session.open();
        assert!(timeout(TIMEOUT, handle.connected()).await.unwrap());

        let mut peer = listener.accept().await.unwrap();
        let join = timeout(TIMEOUT, peer.recv()).await.unwrap().unwrap();
        assert_eq!(join.event, events::JOIN_ROOM);
        assert_eq!(join.data, json!({"userId": "u-1", "salesManagerId": "m-1"}));

        assert!(session.send(&session.compose("Sanction letter is out")));
        let sent = timeout(TIMEOUT, peer.recv()).await.unwrap().unwrap();
        assert_eq!(sent.data["senderId"], "m-1");
        assert_eq!(sent.data["receiverId"], "u-1");
        assert_eq!(sent.data["senderType"], "sales_manager");
    }

    #[test]
    fn on_message_before_open_is_kept_for_the_connection() {
        let (mut session, _l) = chat();
        let first = session.on_message(|_| {});
        let second = session.on_message(|_| {});
        assert_ne!(first, second);
        assert!(session.client().handle().is_none());
    }
}
