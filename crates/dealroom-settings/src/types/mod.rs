//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` and `#[serde(default)]`
//! so a settings file only needs the keys it changes.

mod display;
mod realtime;
mod transport;

pub use display::*;
pub use realtime::*;
pub use transport::*;

use serde::{Deserialize, Serialize};

/// Root settings type.
///
/// ```json
/// {
///   "realtime": { "environment": "development" },
///   "transport": { "connectTimeoutMs": 5000 },
///   "display": { "clockStyle": "twentyFourHour" }
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DealroomSettings {
    /// Settings schema version.
    pub version: String,
    /// Application name.
    pub name: String,
    /// Which realtime server to talk to.
    pub realtime: RealtimeSettings,
    /// Connection establishment policy.
    pub transport: TransportSettings,
    /// Log output.
    pub logging: LoggingSettings,
    /// How messages are presented.
    pub display: DisplaySettings,
}

impl Default for DealroomSettings {
    fn default() -> Self {
        Self {
            version: dealroom_core::constants::VERSION.to_string(),
            name: dealroom_core::constants::NAME.to_string(),
            realtime: RealtimeSettings::default(),
            transport: TransportSettings::default(),
            logging: LoggingSettings::default(),
            display: DisplaySettings::default(),
        }
    }
}

/// Log output settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default `tracing` filter directive when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
