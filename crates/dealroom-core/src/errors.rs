//! Core error types.
//!
//! Normalization and validation never fail. These errors come from the
//! strict entry points used when a caller wants to know *why* a record
//! could not be read, e.g. loading a history export.

use thiserror::Error;

/// Errors from strict parsing of message records.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Input was not valid JSON, or had the wrong top-level shape.
    #[error("invalid message JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
