//! Package-level constants.

/// Current version of dealroom (sourced from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name.
pub const NAME: &str = "dealroom";

/// Display name given to a message whose sender is not known to the caller.
pub const UNKNOWN_SENDER_NAME: &str = "Unknown";

/// Humanized form of anything less than a minute old.
pub const JUST_NOW: &str = "Just now";

/// Minutes in an hour.
pub const MINUTES_PER_HOUR: i64 = 60;

/// Minutes in a day; at or beyond this age timestamps are shown absolutely.
pub const MINUTES_PER_DAY: i64 = 1440;
