//! Human-readable message times.
//!
//! | age                 | output                          |
//! |---------------------|---------------------------------|
//! | under a minute      | `Just now`                      |
//! | 1–59 minutes        | `<n> minutes ago`               |
//! | 1–23 hours          | `1 hour ago` / `<n> hours ago`  |
//! | a day or more       | local date and `hh:mm`          |
//!
//! Timestamps in the future count as "under a minute".

use std::fmt::Display;

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::constants::{JUST_NOW, MINUTES_PER_DAY, MINUTES_PER_HOUR};

/// How the time of day is rendered in absolute timestamps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClockStyle {
    /// `03:07 PM`
    #[default]
    TwelveHour,
    /// `15:07`
    TwentyFourHour,
}

impl ClockStyle {
    fn pattern(self) -> &'static str {
        match self {
            Self::TwelveHour => "%-m/%-d/%Y %I:%M %p",
            Self::TwentyFourHour => "%-m/%-d/%Y %H:%M",
        }
    }
}

/// Humanize `timestamp` against `now`, rendering absolute times in `tz`.
#[must_use]
pub fn humanize_at<Tz>(
    timestamp: DateTime<Utc>,
    now: DateTime<Utc>,
    tz: &Tz,
    style: ClockStyle,
) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let minutes = now.signed_duration_since(timestamp).num_minutes();

    if minutes < 1 {
        return JUST_NOW.to_owned();
    }
    if minutes < MINUTES_PER_HOUR {
        return format!("{minutes} minutes ago");
    }
    if minutes < MINUTES_PER_DAY {
        let hours = minutes / MINUTES_PER_HOUR;
        let unit = if hours == 1 { "hour" } else { "hours" };
        return format!("{hours} {unit} ago");
    }
    timestamp
        .with_timezone(tz)
        .format(style.pattern())
        .to_string()
}

/// Humanize `timestamp` against `clock`, rendering absolute times in the
/// host's local time zone.
#[must_use]
pub fn humanize(timestamp: DateTime<Utc>, clock: &dyn Clock, style: ClockStyle) -> String {
    humanize_at(timestamp, clock.now(), &Local, style)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{Duration, FixedOffset};
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 15, 7, 0).unwrap()
    }

    fn ago(d: Duration) -> String {
        humanize_at(now() - d, now(), &Utc, ClockStyle::TwelveHour)
    }

    #[test]
    fn thirty_seconds_is_just_now() {
        assert_eq!(ago(Duration::seconds(30)), "Just now");
    }

    #[test]
    fn future_is_just_now() {
        assert_eq!(ago(Duration::minutes(-10)), "Just now");
    }

    #[test]
    fn five_minutes() {
        assert_eq!(ago(Duration::minutes(5)), "5 minutes ago");
    }

    #[test]
    fn fifty_nine_minutes() {
        assert_eq!(ago(Duration::seconds(59 * 60 + 59)), "59 minutes ago");
    }

    #[test]
    fn ninety_minutes_is_singular_hour() {
        assert_eq!(ago(Duration::minutes(90)), "1 hour ago");
    }

    #[test]
    fn two_hours_is_plural() {
        assert_eq!(ago(Duration::minutes(120)), "2 hours ago");
    }

    #[test]
    fn just_under_a_day() {
        assert_eq!(ago(Duration::minutes(1439)), "23 hours ago");
    }

    #[test]
    fn three_days_is_absolute_twelve_hour() {
        assert_eq!(ago(Duration::days(3)), "3/7/2025 03:07 PM");
    }

    #[test]
    fn absolute_twenty_four_hour() {
        let s = humanize_at(now() - Duration::days(3), now(), &Utc, ClockStyle::TwentyFourHour);
        assert_eq!(s, "3/7/2025 15:07");
    }

    #[test]
    fn absolute_uses_target_zone() {
        let ist = FixedOffset::east_opt(5 * 3600 + 1800).unwrap();
        let s = humanize_at(now() - Duration::days(3), now(), &ist, ClockStyle::TwentyFourHour);
        assert_eq!(s, "3/7/2025 20:37");
    }

    #[test]
    fn clock_variant_reads_clock() {
        let clock = FixedClock::new(now());
        assert_eq!(
            humanize(now() - Duration::minutes(5), &clock, ClockStyle::default()),
            "5 minutes ago"
        );
    }

    #[test]
    fn clock_style_serde() {
        assert_eq!(
            serde_json::to_string(&ClockStyle::TwentyFourHour).unwrap(),
            "\"twentyFourHour\""
        );
    }

    proptest! {
        #[test]
        fn minutes_band(m in 1_i64..60) {
            prop_assert_eq!(ago(Duration::minutes(m)), format!("{m} minutes ago"));
        }

        #[test]
        fn hours_band(m in 120_i64..1440) {
            prop_assert_eq!(ago(Duration::minutes(m)), format!("{} hours ago", m / 60));
        }

        #[test]
        fn old_messages_are_never_relative(days in 1_i64..3650) {
            let s = ago(Duration::days(days));
            prop_assert!(!s.ends_with("ago"));
            prop_assert_ne!(s, JUST_NOW);
        }
    }
}
