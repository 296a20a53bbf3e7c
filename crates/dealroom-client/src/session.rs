//! Realtime session client.
//!
//! A [`SessionClient`] owns at most one live [`ConnectionHandle`]. Opening
//! a connection never blocks: [`SessionClient::connect`] spawns a driver
//! task that negotiates the link, performs the room join, and then
//! dispatches inbound events to registered callbacks one at a time.
//!
//! ```text
//! Disconnected ──connect()──▶ Connecting ──open ok──▶ Connected
//!      ▲                           │                      │
//!      └──────── open failed ◀─────┘   link lost / disconnect()
//! ```
//!
//! Baseline reactions wired into every connection:
//!
//! | event           | reaction                                          |
//! |-----------------|---------------------------------------------------|
//! | `connect`       | emit `joinRoom` if a counterpart was given         |
//! | `disconnect`    | log; this layer never reconnects                   |
//! | `connect_error` | log                                               |
//!
//! Callbacks registered with [`SessionClient::subscribe`] are installed on
//! every connection before its driver starts, so no lifecycle event can
//! slip past them. A callback added to a live handle after `connect`,
//! `connect_error`, or `disconnect` already fired is called once with that
//! event's payload as it registers.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dealroom_core::{ConnectionId, ParticipantId, Room};
use dealroom_settings::DealroomSettings;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Value, json};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::frame::{Frame, events};
use crate::transport::websocket::WebSocketTransport;
use crate::transport::{Transport, TransportConfig};

/// Event callback. Runs on the connection's driver task.
pub type Callback = Arc<dyn Fn(&Value) + Send + Sync>;

/// Identifies one registered callback, for [`SessionClient::off`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

static NEXT_HANDLER: AtomicU64 = AtomicU64::new(1);

impl HandlerId {
    fn next() -> Self {
        Self(NEXT_HANDLER.fetch_add(1, Ordering::Relaxed))
    }
}

const LIFECYCLE: [&str; 3] = [events::CONNECT, events::CONNECT_ERROR, events::DISCONNECT];

/// Lifecycle of one connection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No live link.
    #[default]
    Disconnected,
    /// Driver task is opening the link.
    Connecting,
    /// Link is up; emits are delivered.
    Connected,
}

// ─────────────────────────────────────────────────────────────────────────────
// Connection handle
// ─────────────────────────────────────────────────────────────────────────────

/// One connection attempt and, once open, the live link.
///
/// Cheap to clone; all clones observe the same connection.
#[derive(Clone)]
pub struct ConnectionHandle {
    shared: Arc<Shared>,
}

struct Shared {
    id: ConnectionId,
    endpoint: String,
    state: watch::Sender<ConnectionState>,
    /// `Some` exactly while `Connected`.
    outbound: Mutex<Option<mpsc::Sender<Frame>>>,
    registry: Mutex<Registry>,
    dropped: AtomicU64,
    /// Taken by `close`; `None` means the handle was closed explicitly.
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
}

#[derive(Default)]
struct Registry {
    handlers: HashMap<String, Vec<(HandlerId, Callback)>>,
    /// Payloads of lifecycle events already dispatched on this connection.
    fired: HashMap<&'static str, Value>,
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("id", &self.shared.id)
            .field("endpoint", &self.shared.endpoint)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl ConnectionHandle {
    fn new(endpoint: String, subscriptions: &[Subscription]) -> (Self, oneshot::Receiver<()>) {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let (state, _) = watch::channel(ConnectionState::Connecting);
        let mut registry = Registry::default();
        for sub in subscriptions {
            registry
                .handlers
                .entry(sub.event.clone())
                .or_default()
                .push((sub.id, Arc::clone(&sub.callback)));
        }
        let handle = Self {
            shared: Arc::new(Shared {
                id: ConnectionId::new(),
                endpoint,
                state,
                outbound: Mutex::new(None),
                registry: Mutex::new(registry),
                dropped: AtomicU64::new(0),
                shutdown: Mutex::new(Some(shutdown_tx)),
            }),
        };
        (handle, shutdown_rx)
    }

    /// Unique ID of this connection.
    pub fn id(&self) -> &ConnectionId {
        &self.shared.id
    }

    /// Endpoint this connection targets.
    pub fn endpoint(&self) -> &str {
        &self.shared.endpoint
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    /// Whether emits are currently delivered.
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Watch state transitions.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Wait until negotiation finishes. `true` if the link came up.
    pub async fn connected(&self) -> bool {
        let mut rx = self.watch_state();
        match rx.wait_for(|s| *s != ConnectionState::Connecting).await {
            Ok(state) => *state == ConnectionState::Connected,
            Err(_) => false,
        }
    }

    /// Emits dropped because the outbound queue was full or closed.
    pub fn drop_count(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    /// Queue `event` for delivery.
    ///
    /// Returns `false` (and sends nothing) unless connected with room in
    /// the outbound queue. Never errors.
    pub fn emit(&self, event: &str, data: Value) -> bool {
        let outbound = self.shared.outbound.lock();
        let Some(tx) = outbound.as_ref() else {
            debug!(connection_id = %self.shared.id, event, "not connected, dropping emit");
            return false;
        };
        if tx.try_send(Frame::new(event, data)).is_ok() {
            true
        } else {
            let _ = self.shared.dropped.fetch_add(1, Ordering::Relaxed);
            debug!(connection_id = %self.shared.id, event, "outbound queue unavailable, dropping emit");
            false
        }
    }

    /// Register `callback` for `event`.
    ///
    /// If `event` is a lifecycle event that already fired on this
    /// connection, `callback` runs once right away on the calling thread.
    /// Nothing is registered on a closed handle.
    pub fn on<F>(&self, event: &str, callback: F) -> HandlerId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let id = HandlerId::next();
        self.register(event, id, Arc::new(callback));
        id
    }

    fn register(&self, event: &str, id: HandlerId, callback: Callback) {
        if self.shared.shutdown.lock().is_none() {
            debug!(connection_id = %self.shared.id, event, "handle closed, not registering");
            return;
        }
        let replay = {
            let mut registry = self.shared.registry.lock();
            registry
                .handlers
                .entry(event.to_owned())
                .or_default()
                .push((id, Arc::clone(&callback)));
            registry.fired.get(event).cloned()
        };
        if let Some(data) = replay {
            callback(&data);
        }
    }

    /// Remove one callback, or every callback for `event` when `id` is `None`.
    pub fn off(&self, event: &str, id: Option<HandlerId>) {
        let mut registry = self.shared.registry.lock();
        let handlers = &mut registry.handlers;
        match id {
            None => drop(handlers.remove(event)),
            Some(id) => {
                if let Some(list) = handlers.get_mut(event) {
                    list.retain(|(h, _)| *h != id);
                    if list.is_empty() {
                        drop(handlers.remove(event));
                    }
                }
            }
        }
    }

    /// Number of callbacks registered for `event`.
    pub fn handler_count(&self, event: &str) -> usize {
        self.shared
            .registry
            .lock()
            .handlers
            .get(event)
            .map_or(0, Vec::len)
    }

    /// Tear the connection down. Idempotent.
    ///
    /// Registered callbacks are dropped and nothing further is dispatched.
    pub fn close(&self) {
        if let Some(tx) = self.shared.shutdown.lock().take() {
            let _ = tx.send(());
        }
        self.shared.registry.lock().handlers.clear();
        let mut outbound = self.shared.outbound.lock();
        drop(outbound.take());
        let _ = self.shared.state.send_replace(ConnectionState::Disconnected);
    }

    fn dispatch(&self, event: &str, data: &Value) {
        // Snapshot so callbacks may call on/off/emit without deadlocking.
        let callbacks = snapshot(&self.shared.registry.lock(), event);
        for callback in callbacks {
            callback(data);
        }
    }

    /// Dispatch a lifecycle event and remember it for late registrations.
    ///
    /// Recording and snapshotting share one lock, so every callback sees
    /// the event exactly once whichever side of the dispatch it registers.
    fn dispatch_lifecycle(&self, event: &'static str, data: Value) {
        let callbacks = {
            let mut registry = self.shared.registry.lock();
            let _ = registry.fired.insert(event, data.clone());
            snapshot(&registry, event)
        };
        for callback in callbacks {
            callback(&data);
        }
    }

    /// Install the live link unless the handle was closed meanwhile.
    fn attach(&self, outbound: mpsc::Sender<Frame>) -> bool {
        let mut slot = self.shared.outbound.lock();
        if self.shared.shutdown.lock().is_none() {
            return false;
        }
        *slot = Some(outbound);
        let _ = self.shared.state.send_replace(ConnectionState::Connected);
        true
    }

    fn detach(&self) {
        let mut slot = self.shared.outbound.lock();
        drop(slot.take());
        let _ = self.shared.state.send_replace(ConnectionState::Disconnected);
    }
}

fn snapshot(registry: &Registry, event: &str) -> Vec<Callback> {
    registry
        .handlers
        .get(event)
        .map(|list| list.iter().map(|(_, cb)| Arc::clone(cb)).collect())
        .unwrap_or_default()
}

// ─────────────────────────────────────────────────────────────────────────────
// Driver task
// ─────────────────────────────────────────────────────────────────────────────

async fn drive(
    handle: ConnectionHandle,
    transport: Arc<dyn Transport>,
    join: Option<Room>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let connection_id = handle.id().clone();
    let endpoint = handle.endpoint().to_owned();

    let opened = tokio::select! {
        biased;
        _ = &mut shutdown => {
            debug!(%connection_id, "closed before connecting");
            return;
        }
        result = transport.open(&endpoint) => result,
    };

    let mut duplex = match opened {
        Ok(duplex) => duplex,
        Err(error) => {
            warn!(%connection_id, endpoint, %error, "connect_error");
            handle.detach();
            handle.dispatch_lifecycle(events::CONNECT_ERROR, json!({ "message": error.to_string() }));
            return;
        }
    };

    if !handle.attach(duplex.outbound) {
        debug!(%connection_id, "closed while connecting");
        return;
    }
    info!(%connection_id, endpoint, "connected");

    if let Some(room) = join {
        match serde_json::to_value(&room) {
            Ok(payload) => {
                info!(
                    %connection_id,
                    user_id = %room.user_id,
                    sales_manager_id = %room.sales_manager_id,
                    "joining room"
                );
                let _ = handle.emit(events::JOIN_ROOM, payload);
            }
            Err(error) => warn!(%connection_id, %error, "failed to encode room"),
        }
    }
    handle.dispatch_lifecycle(events::CONNECT, Value::Null);

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                debug!(%connection_id, "driver stopped by disconnect");
                return;
            }
            frame = duplex.inbound.recv() => match frame {
                Some(frame) if LIFECYCLE.contains(&frame.event.as_str()) => {
                debug!(%connection_id, event = %frame.event, "ignoring reserved event from server");
            }
            Some(frame) => handle.dispatch(&frame.event, &frame.data),
                None => break,
            },
        }
    }

    handle.detach();
    info!(%connection_id, endpoint, "disconnect");
    handle.dispatch_lifecycle(events::DISCONNECT, json!({ "reason": "transport close" }));
}

// ─────────────────────────────────────────────────────────────────────────────
// Session client
// ─────────────────────────────────────────────────────────────────────────────

/// Owner of one logical realtime connection.
///
/// Lifecycle and registration take `&mut self` / `&self` on a single owner;
/// there is no process-wide instance. Dropping the client disconnects.
pub struct SessionClient {
    endpoint: String,
    transport: Arc<dyn Transport>,
    handle: Option<ConnectionHandle>,
    subscriptions: Vec<Subscription>,
}

/// A callback that every new connection starts with.
struct Subscription {
    event: String,
    id: HandlerId,
    callback: Callback,
}

impl fmt::Debug for SessionClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionClient")
            .field("endpoint", &self.endpoint)
            .field("transport", &self.transport)
            .field("handle", &self.handle)
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

impl SessionClient {
    /// Client for `endpoint` over `transport`. Does not connect.
    pub fn new(endpoint: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            endpoint: endpoint.into(),
            transport,
            handle: None,
            subscriptions: Vec::new(),
        }
    }

    /// Client speaking WebSocket to `endpoint`.
    pub fn websocket(endpoint: impl Into<String>, config: TransportConfig) -> Self {
        Self::new(endpoint, Arc::new(WebSocketTransport::new(config)))
    }

    /// WebSocket client for the endpoint and policy in `settings`.
    pub fn from_settings(settings: &DealroomSettings) -> dealroom_settings::Result<Self> {
        let endpoint = settings.realtime.resolve_endpoint()?;
        Ok(Self::websocket(
            endpoint,
            TransportConfig::from(&settings.transport),
        ))
    }

    /// Target endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The current connection, if any.
    pub fn handle(&self) -> Option<&ConnectionHandle> {
        self.handle.as_ref()
    }

    /// State of the current connection; `Disconnected` when there is none.
    pub fn state(&self) -> ConnectionState {
        self.handle
            .as_ref()
            .map_or(ConnectionState::Disconnected, ConnectionHandle::state)
    }

    /// Whether the current connection is up.
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Ensure a connection exists and return its handle.
    ///
    /// A `Connected` handle is returned unchanged. Anything else (none,
    /// still connecting, or lost) is closed and replaced by a fresh
    /// connection negotiated in the background. With a `counterpart`, the
    /// new connection emits `joinRoom` for the room with `self_id` as the
    /// customer once it is up. A sales manager joining from their side
    /// uses [`SessionClient::join`].
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn connect(
        &mut self,
        self_id: impl Into<ParticipantId>,
        counterpart: Option<ParticipantId>,
    ) -> ConnectionHandle {
        let self_id = self_id.into();
        let room = counterpart.map(|other| Room::new(self_id.clone(), other));
        self.open(self_id, room)
    }

    /// Like [`SessionClient::connect`], joining exactly `room` once up.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn join(&mut self, self_id: impl Into<ParticipantId>, room: Room) -> ConnectionHandle {
        self.open(self_id.into(), Some(room))
    }

    fn open(&mut self, self_id: ParticipantId, join: Option<Room>) -> ConnectionHandle {
        if let Some(handle) = self.handle.as_ref().filter(|h| h.is_connected()) {
            debug!(connection_id = %handle.id(), "already connected");
            return handle.clone();
        }
        if let Some(stale) = self.handle.take() {
            debug!(connection_id = %stale.id(), state = ?stale.state(), "replacing stale connection");
            stale.close();
        }

        let (handle, shutdown) = ConnectionHandle::new(self.endpoint.clone(), &self.subscriptions);
        info!(
            connection_id = %handle.id(),
            endpoint = %self.endpoint,
            user_id = %self_id,
            "connecting"
        );

        drop(tokio::spawn(drive(
            handle.clone(),
            Arc::clone(&self.transport),
            join,
            shutdown,
        )));
        self.handle = Some(handle.clone());
        handle
    }

    /// Close and forget the current connection. Idempotent.
    pub fn disconnect(&mut self) {
        if let Some(handle) = self.handle.take() {
            info!(connection_id = %handle.id(), "disconnecting");
            handle.close();
        }
    }

    /// Send `event` if connected; otherwise drop it silently.
    pub fn emit<T: Serialize + ?Sized>(&self, event: &str, payload: &T) {
        let Some(handle) = &self.handle else {
            debug!(event, "no connection, dropping emit");
            return;
        };
        match serde_json::to_value(payload) {
            Ok(data) => {
                let _ = handle.emit(event, data);
            }
            Err(error) => warn!(event, %error, "unserializable payload, dropping emit"),
        }
    }

    /// Register `callback` for `event` on the current connection.
    ///
    /// `None` when there is no connection. Registrations do not carry over
    /// to the next connection; use [`SessionClient::subscribe`] for that.
    pub fn on<F>(&self, event: &str, callback: F) -> Option<HandlerId>
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.handle.as_ref().map(|h| h.on(event, callback))
    }

    /// Unregister one callback, or all callbacks for `event` with `None`.
    /// No-op without a connection.
    pub fn off(&self, event: &str, id: Option<HandlerId>) {
        if let Some(handle) = &self.handle {
            handle.off(event, id);
        }
    }

    /// Register `callback` for `event` on this and every later connection.
    ///
    /// May be called before [`SessionClient::connect`]; the callback is in
    /// place before the driver can dispatch anything.
    pub fn subscribe<F>(&mut self, event: &str, callback: F) -> HandlerId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let id = HandlerId::next();
        let callback: Callback = Arc::new(callback);
        if let Some(handle) = &self.handle {
            handle.register(event, id, Arc::clone(&callback));
        }
        self.subscriptions.push(Subscription {
            event: event.to_owned(),
            id,
            callback,
        });
        id
    }

    /// Drop a subscription (or all for `event` with `None`) from this and
    /// every later connection.
    pub fn unsubscribe(&mut self, event: &str, id: Option<HandlerId>) {
        self.subscriptions
            .retain(|sub| sub.event != event || id.is_some_and(|id| sub.id != id));
        self.off(event, id);
    }
}

impl Drop for SessionClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
