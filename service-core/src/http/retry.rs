//! Rate-limit retry policy for outbound HTTP calls.
//!
//! Upstream APIs answer `429 Too Many Requests` with a `Retry-After` hint in
//! seconds. The policy decides how long to wait before the next attempt and
//! how many attempts a single logical request may consume.

use std::time::Duration;
use tracing::{error, info};

/// Attempts allowed for one logical request, the first one included.
pub const MAX_ATTEMPTS: u32 = 5;

/// Wait used when the server gives no usable hint.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Hints shorter than this are replaced by [`DEFAULT_RETRY_AFTER`].
pub const MIN_RETRY_AFTER: Duration = Duration::from_secs(10);

/// Configuration for 429 retry behavior.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Maximum number of attempts, including the initial one.
    pub max_attempts: u32,
    /// Delay used when `Retry-After` is missing, invalid or too short.
    pub default_delay: Duration,
    /// Smallest server hint that is trusted as-is.
    pub min_delay: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            default_delay: DEFAULT_RETRY_AFTER,
            min_delay: MIN_RETRY_AFTER,
        }
    }
}

impl RateLimitPolicy {
    /// Build a policy from whole-second settings.
    pub fn from_secs(max_attempts: u32, default_delay_secs: u64, min_delay_secs: u64) -> Self {
        Self {
            max_attempts,
            default_delay: Duration::from_secs(default_delay_secs),
            min_delay: Duration::from_secs(min_delay_secs),
        }
    }

    /// Whether another attempt may follow the given number of attempts already made.
    pub fn allows_another_attempt(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts
    }

    /// Compute the wait before the next attempt from a raw `Retry-After` value.
    ///
    /// A hint below `min_delay` is discarded in favour of `default_delay`
    /// rather than raised to the threshold.
    pub fn retry_delay(&self, retry_after: Option<&str>) -> Duration {
        let hinted = retry_after
            .and_then(|value| value.trim().parse::<f64>().ok())
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok());

        let Some(delay) = hinted else {
            error!(
                retry_after = ?retry_after,
                default_secs = self.default_delay.as_secs_f64(),
                "No usable Retry-After header found, falling back to default"
            );
            return self.default_delay;
        };

        if delay < self.min_delay {
            info!(
                retry_after_secs = delay.as_secs_f64(),
                default_secs = self.default_delay.as_secs_f64(),
                "Retry time below threshold, falling back to default"
            );
            return self.default_delay;
        }

        delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_default() {
        let policy = RateLimitPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.default_delay, Duration::from_secs(60));
        assert_eq!(policy.min_delay, Duration::from_secs(10));
    }

    #[test]
    fn test_missing_or_invalid_header_uses_default() {
        let policy = RateLimitPolicy::default();
        assert_eq!(policy.retry_delay(None), Duration::from_secs(60));
        assert_eq!(policy.retry_delay(Some("soon")), Duration::from_secs(60));
        assert_eq!(policy.retry_delay(Some("")), Duration::from_secs(60));
        assert_eq!(policy.retry_delay(Some("0")), Duration::from_secs(60));
        assert_eq!(policy.retry_delay(Some("-3")), Duration::from_secs(60));
    }

    #[test]
    fn test_hint_below_threshold_is_discarded() {
        let policy = RateLimitPolicy::default();
        assert_eq!(policy.retry_delay(Some("2")), Duration::from_secs(60));
        assert_eq!(policy.retry_delay(Some("5")), Duration::from_secs(60));
    }

    #[test]
    fn test_hint_at_or_above_threshold_is_honoured() {
        let policy = RateLimitPolicy::default();
        assert_eq!(policy.retry_delay(Some("10")), Duration::from_secs(10));
        assert_eq!(policy.retry_delay(Some(" 15 ")), Duration::from_secs(15));
        assert_eq!(policy.retry_delay(Some("120")), Duration::from_secs(120));
    }

    #[test]
    fn test_attempt_budget() {
        let policy = RateLimitPolicy::default();
        assert!(policy.allows_another_attempt(4));
        assert!(!policy.allows_another_attempt(5));
    }
}
