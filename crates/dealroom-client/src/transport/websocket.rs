//! WebSocket transport over `tokio-tungstenite`.
//!
//! One pump task per link moves frames between the socket and the
//! [`Duplex`] channels. The pump ends when the server closes, the socket
//! errors, or the client drops its outbound sender.

use std::sync::Once;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

use super::{Duplex, Transport, TransportConfig};
use crate::error::TransportError;
use crate::frame::Frame;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Transport speaking the frame envelope over a WebSocket.
#[derive(Clone, Debug, Default)]
pub struct WebSocketTransport {
    config: TransportConfig,
}

impl WebSocketTransport {
    /// Transport with the given establishment policy.
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }

    /// The establishment policy in use.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    async fn open_once(&self, endpoint: &str) -> Result<WsStream, TransportError> {
        install_crypto_provider();
        let timeout = self.config.connect_timeout;
        match tokio::time::timeout(timeout, connect_async(endpoint)).await {
            Err(_) => Err(TransportError::Timeout {
                endpoint: endpoint.to_owned(),
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            }),
            Ok(Err(error)) => Err(classify(endpoint, error)),
            Ok(Ok((ws, _response))) => Ok(ws),
        }
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn open(&self, endpoint: &str) -> Result<Duplex, TransportError> {
        let policy = self.config.backoff;
        let mut attempt = 0;
        loop {
            match self.open_once(endpoint).await {
                Ok(ws) => {
                    info!(endpoint, attempts = attempt + 1, "websocket connected");
                    return Ok(spawn_pump(ws, self.config.buffer));
                }
                Err(error) if error.is_retryable() && policy.allows_retry(attempt) => {
                    let delay = policy.delay(attempt);
                    warn!(
                        endpoint,
                        attempt = attempt + 1,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        %error,
                        "websocket connect failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

/// `wss://` endpoints need a process-wide rustls provider.
fn install_crypto_provider() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        // Err means the host process installed its own provider first.
        if rustls::crypto::ring::default_provider().install_default().is_err() {
            debug!("rustls crypto provider already installed");
        }
    });
}

fn classify(endpoint: &str, error: tungstenite::Error) -> TransportError {
    match error {
        tungstenite::Error::Url(e) => TransportError::Refused {
            endpoint: endpoint.to_owned(),
            reason: e.to_string(),
        },
        tungstenite::Error::Http(response) => TransportError::Refused {
            endpoint: endpoint.to_owned(),
            reason: format!("HTTP {}", response.status()),
        },
        other => TransportError::Connect {
            endpoint: endpoint.to_owned(),
            reason: other.to_string(),
        },
    }
}

fn spawn_pump(ws: WsStream, buffer: usize) -> Duplex {
    let (out_tx, out_rx) = mpsc::channel(buffer);
    let (in_tx, in_rx) = mpsc::channel(buffer);
    drop(tokio::spawn(pump(ws, out_rx, in_tx)));
    Duplex {
        outbound: out_tx,
        inbound: in_rx,
    }
}

async fn pump(ws: WsStream, mut outbound: mpsc::Receiver<Frame>, inbound: mpsc::Sender<Frame>) {
    let (mut sink, mut stream) = ws.split();

    loop {
        tokio::select! {
            frame = outbound.recv() => {
                let Some(frame) = frame else {
                    debug!("outbound closed, closing websocket");
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                };
                let text = match frame.encode() {
                    Ok(text) => text,
                    Err(error) => {
                        warn!(event = %frame.event, %error, "dropping unencodable frame");
                        continue;
                    }
                };
                if let Err(error) = sink.send(Message::Text(text.into())).await {
                    warn!(%error, "websocket send failed");
                    break;
                }
            }
            msg = stream.next() => {
                let msg = match msg {
                    Some(Ok(msg)) => msg,
                    Some(Err(error)) => {
                        warn!(%error, "websocket read failed");
                        break;
                    }
                    None => break,
                };
                match msg {
                    Message::Text(text) => match Frame::decode(text.as_str()) {
                        Ok(frame) => {
                            if inbound.send(frame).await.is_err() {
                                break;
                            }
                        }
                        Err(error) => debug!(%error, "skipping undecodable frame"),
                    },
                    Message::Binary(bytes) => {
                        debug!(len = bytes.len(), "skipping binary frame");
                    }
                    Message::Close(close) => {
                        debug!(?close, "server closed websocket");
                        break;
                    }
                    Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backoff::BackoffPolicy;
    use assert_matches::assert_matches;
    use serde_json::json;
    use tokio::net::TcpListener;

    fn fast_config(retries: u32) -> TransportConfig {
        TransportConfig {
            connect_timeout: Duration::from_millis(500),
            backoff: BackoffPolicy {
                max_retries: retries,
                base_delay_ms: 10,
                max_delay_ms: 20,
                jitter_factor: 0.0,
            },
            buffer: 8,
        }
    }

    async fn free_port_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("ws://{addr}")
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_connect_error() {
        let url = free_port_url().await;
        let transport = WebSocketTransport::new(fast_config(0));
        assert_matches!(
            transport.open(&url).await,
            Err(TransportError::Connect { .. })
        );
    }

    #[tokio::test]
    async fn retries_then_gives_up() {
        let url = free_port_url().await;
        let transport = WebSocketTransport::new(fast_config(2));
        let started = std::time::Instant::now();
        assert_matches!(
            transport.open(&url).await,
            Err(TransportError::Connect { .. })
        );
        // Two retries: 10ms + 20ms of backoff.
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[tokio::test]
    async fn invalid_url_is_refused() {
        let transport = WebSocketTransport::new(fast_config(3));
        assert_matches!(
            transport.open("http://not-a-websocket").await,
            Err(TransportError::Refused { .. })
        );
    }

    #[tokio::test]
    async fn secure_endpoint_attempts_tls_handshake() {
        // Accepts TCP then hangs up before any TLS bytes are answered.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("wss://{}", listener.local_addr().unwrap());
        let _server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            drop(socket);
        });

        let transport = WebSocketTransport::new(fast_config(0));
        let error = match transport.open(&url).await {
            Ok(_) => panic!("handshake against a bare socket cannot succeed"),
            Err(error) => error,
        };
        assert!(!error.to_string().contains("TLS support not compiled in"));
        assert_matches!(error, TransportError::Connect { .. });
    }

    #[tokio::test]
    async fn handshake_timeout() {
        // Accepts TCP but never answers the upgrade.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        let _hold = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let mut config = fast_config(0);
        config.connect_timeout = Duration::from_millis(100);
        let transport = WebSocketTransport::new(config);
        assert_matches!(
            transport.open(&url).await,
            Err(TransportError::Timeout { timeout_ms: 100, .. })
        );
    }

    #[tokio::test]
    async fn frames_flow_both_ways_and_junk_is_skipped() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(socket).await.unwrap();
            ws.send(Message::Binary(vec![1, 2, 3].into())).await.unwrap();
            ws.send(Message::Text("garbage".into())).await.unwrap();
            ws.send(Message::Text(
                r#"{"event":"receiveMessage","data":{"text":"hello"}}"#.into(),
            ))
            .await
            .unwrap();
            let echoed = loop {
                if let Some(Ok(Message::Text(text))) = ws.next().await {
                    break text.as_str().to_owned();
                }
            };
            ws.close(None).await.unwrap();
            echoed
        });

        let transport = WebSocketTransport::new(fast_config(0));
        let mut duplex = transport.open(&url).await.unwrap();

        let frame = duplex.inbound.recv().await.unwrap();
        assert_eq!(frame, Frame::new("receiveMessage", json!({"text": "hello"})));

        duplex
            .outbound
            .send(Frame::new("sendMessage", json!({"text": "back"})))
            .await
            .unwrap();
        let echoed: serde_json::Value = serde_json::from_str(&server.await.unwrap()).unwrap();
        assert_eq!(echoed["event"], "sendMessage");

        assert!(duplex.inbound.recv().await.is_none());
    }
}
