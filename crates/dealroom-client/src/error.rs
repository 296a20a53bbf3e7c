//! Transport error types.

use thiserror::Error;

/// Errors from opening or using a transport.
///
/// These never reach session callers as `Err`: a failed open surfaces as the
/// `connect_error` event, and a lost connection as `disconnect`.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Could not reach the endpoint (DNS, TCP, TLS, handshake I/O).
    #[error("failed to connect to {endpoint}: {reason}")]
    Connect {
        /// Endpoint being opened.
        endpoint: String,
        /// Underlying failure.
        reason: String,
    },

    /// The handshake did not finish within the per-attempt timeout.
    #[error("connecting to {endpoint} timed out after {timeout_ms}ms")]
    Timeout {
        /// Endpoint being opened.
        endpoint: String,
        /// Per-attempt timeout.
        timeout_ms: u64,
    },

    /// The endpoint was reached but rejected the connection, or is not a
    /// valid WebSocket URL.
    #[error("connection to {endpoint} refused: {reason}")]
    Refused {
        /// Endpoint being opened.
        endpoint: String,
        /// Why it was refused.
        reason: String,
    },

    /// A frame could not be encoded or decoded.
    #[error("invalid frame: {0}")]
    Codec(#[from] serde_json::Error),
}

impl TransportError {
    /// Whether another attempt might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connect { .. } | Self::Timeout { .. })
    }
}
