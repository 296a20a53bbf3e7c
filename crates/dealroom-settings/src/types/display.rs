//! Presentation settings.

use dealroom_core::ClockStyle;
use dealroom_core::constants::UNKNOWN_SENDER_NAME;
use serde::{Deserialize, Serialize};

/// How messages are shown to the person at the terminal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DisplaySettings {
    /// 12- or 24-hour clock for timestamps older than a day.
    pub clock_style: ClockStyle,
    /// Name shown for messages whose author name is unknown.
    pub default_name: String,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            clock_style: ClockStyle::default(),
            default_name: UNKNOWN_SENDER_NAME.to_string(),
        }
    }
}
