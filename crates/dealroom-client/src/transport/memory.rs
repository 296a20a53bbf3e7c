//! In-process transport.
//!
//! Each successful [`MemoryTransport::open`] hands the server side of the
//! link to the paired [`MemoryListener`] as a [`MemoryPeer`]. Tests drive
//! the peer to play the realtime server.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

use super::{Duplex, Transport};
use crate::error::TransportError;
use crate::frame::Frame;

const DEFAULT_BUFFER: usize = 64;

/// Transport whose links are in-memory channels.
#[derive(Clone, Debug)]
pub struct MemoryTransport {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    refusing: AtomicBool,
    opens: AtomicUsize,
    buffer: usize,
    peers: mpsc::UnboundedSender<MemoryPeer>,
}

/// Receives the server side of every link opened on a [`MemoryTransport`].
#[derive(Debug)]
pub struct MemoryListener {
    peers: mpsc::UnboundedReceiver<MemoryPeer>,
}

/// Server side of one in-memory link.
#[derive(Debug)]
pub struct MemoryPeer {
    endpoint: String,
    to_client: mpsc::Sender<Frame>,
    from_client: mpsc::Receiver<Frame>,
}

impl MemoryTransport {
    /// A transport and the listener for the links it opens.
    pub fn new() -> (Self, MemoryListener) {
        Self::with_buffer(DEFAULT_BUFFER)
    }

    /// Like [`new`](Self::new) with a specific per-direction queue size.
    pub fn with_buffer(buffer: usize) -> (Self, MemoryListener) {
        let (tx, rx) = mpsc::unbounded_channel();
        let transport = Self {
            inner: Arc::new(Inner {
                refusing: AtomicBool::new(false),
                opens: AtomicUsize::new(0),
                buffer: buffer.max(1),
                peers: tx,
            }),
        };
        (transport, MemoryListener { peers: rx })
    }

    /// Make subsequent opens fail with [`TransportError::Refused`].
    pub fn set_refusing(&self, refusing: bool) {
        self.inner.refusing.store(refusing, Ordering::Relaxed);
    }

    /// Number of open attempts so far, refused ones included.
    pub fn open_count(&self) -> usize {
        self.inner.opens.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn open(&self, endpoint: &str) -> Result<Duplex, TransportError> {
        let _ = self.inner.opens.fetch_add(1, Ordering::Relaxed);
        if self.inner.refusing.load(Ordering::Relaxed) {
            return Err(TransportError::Refused {
                endpoint: endpoint.to_owned(),
                reason: "memory transport is refusing connections".into(),
            });
        }

        let (client_tx, server_rx) = mpsc::channel(self.inner.buffer);
        let (server_tx, client_rx) = mpsc::channel(self.inner.buffer);
        let peer = MemoryPeer {
            endpoint: endpoint.to_owned(),
            to_client: server_tx,
            from_client: server_rx,
        };
        if self.inner.peers.send(peer).is_err() {
            return Err(TransportError::Refused {
                endpoint: endpoint.to_owned(),
                reason: "memory listener dropped".into(),
            });
        }
        debug!(endpoint, "memory link opened");

        Ok(Duplex {
            outbound: client_tx,
            inbound: client_rx,
        })
    }
}

impl MemoryListener {
    /// Next opened link, or `None` once every transport clone is dropped.
    pub async fn accept(&mut self) -> Option<MemoryPeer> {
        self.peers.recv().await
    }
}

impl MemoryPeer {
    /// Endpoint the client asked for.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Push an event to the client. `false` if the client side is gone.
    pub async fn send(&self, event: &str, data: Value) -> bool {
        self.to_client.send(Frame::new(event, data)).await.is_ok()
    }

    /// Next frame from the client, or `None` once the client closed.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.from_client.recv().await
    }

    /// Drop the server side; the client observes a disconnect.
    pub fn close(self) {
        drop(self);
    }
}
