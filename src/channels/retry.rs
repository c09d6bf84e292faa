//! Retry with exponential backoff for outbound sends
//!
//! The default policy makes zero retries, so delivery is at-most-once unless
//! the operator opts in.

use std::time::{Duration, SystemTime};

/// Retry policy for outbound sends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts after the first send
    pub max_retries: u32,
    /// Base delay between retries (doubles each attempt)
    pub base_delay: Duration,
    /// Maximum delay cap
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Policy with the given retry count and default delays
    #[must_use]
    pub fn with_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }
}

/// Whether a failed send is worth retrying
///
/// `None` means the request never got an HTTP response (connect error,
/// timeout). Rate limits (429) and server errors (5xx) are recoverable; other
/// client errors are not.
#[must_use]
pub fn is_recoverable(status: Option<u16>) -> bool {
    match status {
        None | Some(429) => true,
        Some(s) => (500..600).contains(&s),
    }
}

/// Compute the delay before the next retry attempt
///
/// `min(base_delay * 2^attempt + jitter, max_delay)`, with jitter of 0-25% of
/// the computed delay derived from the system clock.
#[must_use]
pub fn delay_for_attempt(policy: &RetryPolicy, attempt: u32) -> Duration {
    let base = policy
        .base_delay
        .saturating_mul(2u32.saturating_pow(attempt));
    let base = base.min(policy.max_delay);

    let jitter_nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();

    let jitter_fraction = f64::from(jitter_nanos % 250) / 1000.0;
    let jitter = base.mul_f64(jitter_fraction);

    (base + jitter).min(policy.max_delay)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_at_most_once() {
        assert_eq!(RetryPolicy::default().max_retries, 0);
    }

    #[test]
    fn recoverable_statuses() {
        assert!(is_recoverable(None));
        assert!(is_recoverable(Some(429)));
        assert!(is_recoverable(Some(500)));
        assert!(is_recoverable(Some(503)));
    }

    #[test]
    fn client_errors_not_recoverable() {
        assert!(!is_recoverable(Some(400)));
        assert!(!is_recoverable(Some(401)));
        assert!(!is_recoverable(Some(404)));
    }

    #[test]
    fn delay_grows_exponentially() {
        let policy = RetryPolicy {
            max_retries: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(60),
        };

        let d0 = delay_for_attempt(&policy, 0);
        let d2 = delay_for_attempt(&policy, 2);

        assert!(d0 >= Duration::from_millis(100) && d0 <= Duration::from_millis(125));
        assert!(d2 >= Duration::from_millis(400) && d2 <= Duration::from_millis(500));
    }

    #[test]
    fn delay_capped_at_max() {
        let policy = RetryPolicy {
            max_retries: 10,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
        };

        assert!(delay_for_attempt(&policy, 10) <= Duration::from_secs(5));
    }
}
