//! Structured logging via `tracing`.
//!
//! Libraries only emit events; the binary installs the subscriber with
//! [`init_subscriber`]. Tests capture events with [`capture_logs`].

pub mod test_utils;

pub use test_utils::{CapturedEvent, CapturedLogs, capture_logs};

/// Install the global subscriber writing compact lines to stderr.
///
/// `RUST_LOG` wins over `level` when set. Calling this more than once is
/// harmless; later calls are ignored.
pub fn init_subscriber(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_subscriber_is_idempotent() {
        init_subscriber("warn");
        init_subscriber("debug");
    }
}
