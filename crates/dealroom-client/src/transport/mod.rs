//! How frames reach the realtime server.
//!
//! A [`Transport`] opens a [`Duplex`]: a pair of channels carrying decoded
//! [`Frame`]s. The session layer never touches sockets directly, which is
//! what lets tests swap in [`memory::MemoryTransport`].

pub mod memory;
pub mod websocket;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use dealroom_settings::TransportSettings;
use tokio::sync::mpsc;

use crate::backoff::BackoffPolicy;
use crate::error::TransportError;
use crate::frame::Frame;

/// Both directions of one open link.
///
/// Dropping `outbound` asks the transport to close. `inbound` yielding
/// `None` means the link is gone.
#[derive(Debug)]
pub struct Duplex {
    /// Frames to send to the server.
    pub outbound: mpsc::Sender<Frame>,
    /// Frames received from the server.
    pub inbound: mpsc::Receiver<Frame>,
}

/// Opens links to a realtime endpoint.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Open a link to `endpoint`, including any retries the transport's
    /// own policy allows.
    async fn open(&self, endpoint: &str) -> Result<Duplex, TransportError>;
}

/// Connection establishment knobs shared by transports.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransportConfig {
    /// Per-attempt handshake timeout.
    pub connect_timeout: Duration,
    /// Retry schedule for the initial open.
    pub backoff: BackoffPolicy,
    /// Capacity of each direction's frame queue.
    pub buffer: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::from(&TransportSettings::default())
    }
}

impl From<&TransportSettings> for TransportConfig {
    fn from(settings: &TransportSettings) -> Self {
        Self {
            connect_timeout: Duration::from_millis(settings.connect_timeout_ms),
            backoff: BackoffPolicy::from(settings),
            buffer: settings.outbound_buffer.max(1),
        }
    }
}
