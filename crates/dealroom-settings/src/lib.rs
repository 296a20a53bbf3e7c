//! # dealroom-settings
//!
//! Layered configuration for the dealroom chat client.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`DealroomSettings::default()`]
//! 2. **User file**: `~/.dealroom/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `DEALROOM_*` overrides (highest priority)
//!
//! Libraries take a [`DealroomSettings`] by value; only the binary uses the
//! process-wide [`get_settings`] cache.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, apply_overrides, deep_merge, load_settings, load_settings_from_path,
    settings_path,
};
pub use types::*;

use std::sync::OnceLock;

static SETTINGS: OnceLock<DealroomSettings> = OnceLock::new();

/// Process-wide settings.
///
/// First call loads `~/.dealroom/settings.json` plus env overrides; a load
/// failure is logged and compiled defaults are used instead.
pub fn get_settings() -> &'static DealroomSettings {
    SETTINGS.get_or_init(|| {
        load_settings().unwrap_or_else(|error| {
            tracing::warn!(%error, "failed to load settings, using defaults");
            let mut defaults = DealroomSettings::default();
            apply_env_overrides(&mut defaults);
            defaults
        })
    })
}

/// Seed the process-wide settings before the first [`get_settings`] call.
///
/// Returns the value back if settings were already initialized.
#[allow(clippy::result_large_err)]
pub fn init_settings(settings: DealroomSettings) -> std::result::Result<(), DealroomSettings> {
    SETTINGS.set(settings)
}
