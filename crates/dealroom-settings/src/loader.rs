//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`DealroomSettings::default()`]
//! 2. If `~/.dealroom/settings.json` exists, deep-merge it over the defaults
//! 3. Apply `DEALROOM_*` environment overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use dealroom_core::ClockStyle;
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::{DealroomSettings, Environment};

/// Path to the settings file (`~/.dealroom/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".dealroom").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<DealroomSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from `path` with env var overrides.
///
/// A missing file yields defaults. A file with invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<DealroomSettings> {
    let mut settings = load_file_layer(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Defaults merged with the file at `path`, without env overrides.
pub fn load_file_layer(path: &Path) -> Result<DealroomSettings> {
    let defaults = serde_json::to_value(DealroomSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `DEALROOM_*` overrides from the process environment.
pub fn apply_env_overrides(settings: &mut DealroomSettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply overrides read through `lookup`.
///
/// Values are parsed strictly; anything invalid is ignored with a warning
/// and the file/default value stays.
pub fn apply_overrides<F>(settings: &mut DealroomSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let env = EnvReader { lookup };

    // ── Realtime ────────────────────────────────────────────────────
    if let Some(v) = env.parsed("DEALROOM_ENV", Environment::parse) {
        settings.realtime.environment = v;
    }
    if let Some(v) = env.string("DEALROOM_ORIGIN") {
        settings.realtime.origin = v;
    }
    if let Some(v) = env.string("DEALROOM_DEV_ENDPOINT") {
        settings.realtime.dev_endpoint = v;
    }

    // ── Transport ───────────────────────────────────────────────────
    if let Some(v) = env.parsed("DEALROOM_CONNECT_TIMEOUT_MS", |s| {
        parse_u64_range(s, 100, 300_000)
    }) {
        settings.transport.connect_timeout_ms = v;
    }
    if let Some(v) = env.parsed("DEALROOM_CONNECT_RETRIES", |s| parse_u32_range(s, 0, 10)) {
        settings.transport.connect_retries = v;
    }

    // ── Logging / display ───────────────────────────────────────────
    if let Some(v) = env.string("DEALROOM_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = env.parsed("DEALROOM_CLOCK_STYLE", parse_clock_style) {
        settings.display.clock_style = v;
    }
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse a string as a `u64` within an inclusive range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (min..=max).contains(&n).then_some(n)
}

/// Parse a string as a `u32` within an inclusive range.
pub fn parse_u32_range(val: &str, min: u32, max: u32) -> Option<u32> {
    let n: u32 = val.parse().ok()?;
    (min..=max).contains(&n).then_some(n)
}

/// Parse `12`/`12h`/`twelveHour` or `24`/`24h`/`twentyFourHour`, ignoring case.
pub fn parse_clock_style(val: &str) -> Option<ClockStyle> {
    match val.to_ascii_lowercase().as_str() {
        "12" | "12h" | "twelvehour" => Some(ClockStyle::TwelveHour),
        "24" | "24h" | "twentyfourhour" => Some(ClockStyle::TwentyFourHour),
        _ => None,
    }
}

// ── Env var readers ─────────────────────────────────────────────────────────

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn parsed<T>(&self, name: &str, parse: impl FnOnce(&str) -> Option<T>) -> Option<T> {
        let val = self.string(name)?;
        let result = parse(&val);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid env var, ignoring");
        }
        result
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
