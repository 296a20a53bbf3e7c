//! # dealroom-client
//!
//! Realtime session client for a dealroom chat room.
//!
//! - [`SessionClient`]: one logical connection per instance, with the
//!   room-join handshake, event subscriptions, and guarded emit
//! - [`ChatSession`]: chat-level wrapper that validates outbound messages
//!   and normalizes inbound ones
//! - [`Transport`]: how frames reach the server; [`WebSocketTransport`] for
//!   real servers, [`MemoryTransport`] for tests
//! - [`Frame`]: the `{"event", "data"}` wire envelope
//!
//! All lifecycle calls must be made from inside a Tokio runtime: opening a
//! connection spawns a driver task.

#![deny(unsafe_code)]

pub mod backoff;
pub mod chat;
pub mod error;
pub mod frame;
pub mod session;
pub mod transport;

pub use backoff::BackoffPolicy;
pub use chat::ChatSession;
pub use error::TransportError;
pub use frame::{Frame, events};
pub use session::{ConnectionHandle, ConnectionState, HandlerId, SessionClient};
pub use transport::memory::{MemoryListener, MemoryPeer, MemoryTransport};
pub use transport::websocket::WebSocketTransport;
pub use transport::{Duplex, Transport, TransportConfig};
