//! Realtime server selection.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Deployment environment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Talk to the server behind the application origin.
    #[default]
    Production,
    /// Talk to a local development server.
    Development,
}

impl Environment {
    /// Parse `production`/`prod` or `development`/`dev`, ignoring case.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "production" | "prod" => Some(Self::Production),
            "development" | "dev" => Some(Self::Development),
            _ => None,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Production => "production",
            Self::Development => "development",
        })
    }
}

/// Where the realtime server lives.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RealtimeSettings {
    /// Which endpoint rule applies.
    pub environment: Environment,
    /// Application origin (`https://host[:port]`) used in production.
    pub origin: String,
    /// Endpoint used in development.
    pub dev_endpoint: String,
}

impl Default for RealtimeSettings {
    fn default() -> Self {
        Self {
            environment: Environment::Production,
            origin: "http://localhost:3000".to_string(),
            dev_endpoint: "ws://localhost:5000".to_string(),
        }
    }
}

impl RealtimeSettings {
    /// WebSocket URL for the configured environment.
    ///
    /// Production maps the origin's scheme `http` → `ws` and `https` → `wss`
    /// (origins already using `ws`/`wss` pass through). Development returns
    /// [`dev_endpoint`](Self::dev_endpoint) as is.
    pub fn resolve_endpoint(&self) -> Result<String> {
        match self.environment {
            Environment::Development => Ok(self.dev_endpoint.clone()),
            Environment::Production => origin_to_ws(&self.origin),
        }
    }
}

fn origin_to_ws(origin: &str) -> Result<String> {
    let origin = origin.trim().trim_end_matches('/');
    let Some((scheme, rest)) = origin.split_once("://") else {
        return Err(SettingsError::InvalidValue(format!(
            "origin has no scheme: {origin:?}"
        )));
    };
    if rest.is_empty() {
        return Err(SettingsError::InvalidValue(format!(
            "origin has no host: {origin:?}"
        )));
    }
    let ws_scheme = match scheme.to_ascii_lowercase().as_str() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(SettingsError::InvalidValue(format!(
                "unsupported origin scheme: {other:?}"
            )));
        }
    };
    Ok(format!("{ws_scheme}://{rest}"))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
