//! Exponential backoff between connection attempts.

use std::time::Duration;

use dealroom_settings::TransportSettings;

/// Bounded retry schedule for the initial open of a transport.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Extra attempts after the first failure.
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds.
    pub base_delay_ms: u64,
    /// Ceiling for any single delay, in milliseconds.
    pub max_delay_ms: u64,
    /// Jitter as a fraction of the delay (0.0–1.0).
    pub jitter_factor: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from(&TransportSettings::default())
    }
}

impl From<&TransportSettings> for BackoffPolicy {
    fn from(settings: &TransportSettings) -> Self {
        Self {
            max_retries: settings.connect_retries,
            base_delay_ms: settings.base_delay_ms,
            max_delay_ms: settings.max_delay_ms,
            jitter_factor: settings.jitter_factor.clamp(0.0, 1.0),
        }
    }
}

impl BackoffPolicy {
    /// Policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Whether a retry is allowed after `attempt` failed (zero-based).
    pub fn allows_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }

    /// Delay before retry number `attempt` (zero-based), with random jitter.
    pub fn delay(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.delay_ms_with_random(attempt, rand::random::<f64>()))
    }

    /// `min(max_delay, base * 2^attempt)` scaled by `1 ± jitter`.
    ///
    /// `random` in `[0.0, 1.0)` maps onto `[-jitter, +jitter]`.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn delay_ms_with_random(&self, attempt: u32, random: f64) -> u64 {
        let exponential = self
            .base_delay_ms
            .saturating_mul(1u64 << attempt.min(31));
        let capped = exponential.min(self.max_delay_ms);

        let jitter = 1.0 + (random * 2.0 - 1.0) * self.jitter_factor;
        ((capped as f64) * jitter).round().max(0.0) as u64
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> BackoffPolicy {
        BackoffPolicy {
            max_retries: 3,
            base_delay_ms: 100,
            max_delay_ms: 1_000,
            jitter_factor: 0.2,
        }
    }

    #[test]
    fn grows_exponentially_without_jitter() {
        let p = policy();
        assert_eq!(p.delay_ms_with_random(0, 0.5), 100);
        assert_eq!(p.delay_ms_with_random(1, 0.5), 200);
        assert_eq!(p.delay_ms_with_random(2, 0.5), 400);
    }

    #[test]
    fn caps_at_max() {
        assert_eq!(policy().delay_ms_with_random(10, 0.5), 1_000);
    }

    #[test]
    fn jitter_bounds() {
        let p = policy();
        assert_eq!(p.delay_ms_with_random(0, 0.0), 80);
        assert_eq!(p.delay_ms_with_random(0, 1.0), 120);
    }

    #[test]
    fn huge_attempt_does_not_overflow() {
        assert_eq!(policy().delay_ms_with_random(u32::MAX, 0.5), 1_000);
    }

    #[test]
    fn random_delay_stays_in_band() {
        let p = policy();
        for _ in 0..100 {
            let d = p.delay(1).as_millis();
            assert!((160..=240).contains(&d), "{d}");
        }
    }

    #[test]
    fn retry_budget() {
        let p = policy();
        assert!(p.allows_retry(0));
        assert!(p.allows_retry(2));
        assert!(!p.allows_retry(3));
        assert!(!BackoffPolicy::none().allows_retry(0));
    }

    #[test]
    fn from_settings_clamps_jitter() {
        let settings = TransportSettings {
            jitter_factor: 3.0,
            connect_retries: 4,
            ..TransportSettings::default()
        };
        let p = BackoffPolicy::from(&settings);
        assert!((p.jitter_factor - 1.0).abs() < f64::EPSILON);
        assert_eq!(p.max_retries, 4);
    }
}
