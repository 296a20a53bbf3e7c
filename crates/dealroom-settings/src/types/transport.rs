//! Connection establishment policy.

use serde::{Deserialize, Serialize};

/// How the client opens its realtime connection.
///
/// Retries apply to the initial open only. Once a connection has been
/// established and then lost, nothing reconnects automatically.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransportSettings {
    /// Per-attempt handshake timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Extra attempts after the first failed open.
    pub connect_retries: u32,
    /// Base delay for exponential backoff between attempts.
    pub base_delay_ms: u64,
    /// Ceiling for the backoff delay.
    pub max_delay_ms: u64,
    /// Random jitter as a fraction of the computed delay (0.0–1.0).
    pub jitter_factor: f64,
    /// Capacity of the outbound frame queue.
    pub outbound_buffer: usize,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 20_000,
            connect_retries: 2,
            base_delay_ms: 500,
            max_delay_ms: 5_000,
            jitter_factor: 0.2,
            outbound_buffer: 64,
        }
    }
}
