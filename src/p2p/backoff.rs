use super::prelude::*;

/// Delays between successive retries of the same operation, doubling from `base` up to
/// `max`.
///
/// A container which keeps failing to reach quorum is re-polled after `delay(n)` where
/// `n` counts its consecutive inconclusive rounds, so that a stalled container does not
/// flood the network while still being retried forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoff {
    base: Duration,
    max: Duration,
}

impl ExponentialBackoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        ExponentialBackoff { base, max: std::cmp::max(base, max) }
    }

    /// The delay before retry number `attempt` (counting from 1). Attempt 0 retries
    /// immediately.
    pub fn delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::from_millis(0);
        }
        let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
        match self.base.checked_mul(factor) {
            Some(delay) if delay < self.max => delay,
            _ => self.max,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_delay_doubles() {
        let backoff = ExponentialBackoff::new(Duration::from_millis(100), Duration::from_secs(1));
        assert_eq!(backoff.delay(0), Duration::from_millis(0));
        assert_eq!(backoff.delay(1), Duration::from_millis(100));
        assert_eq!(backoff.delay(2), Duration::from_millis(200));
        assert_eq!(backoff.delay(4), Duration::from_millis(800));
    }

    #[test]
    fn test_delay_is_capped() {
        let backoff = ExponentialBackoff::new(Duration::from_millis(100), Duration::from_secs(1));
        assert_eq!(backoff.delay(5), Duration::from_secs(1));
        assert_eq!(backoff.delay(40), Duration::from_secs(1));
        assert_eq!(backoff.delay(u32::MAX), Duration::from_secs(1));
    }

    #[test]
    fn test_max_below_base() {
        let backoff = ExponentialBackoff::new(Duration::from_millis(500), Duration::from_millis(10));
        assert_eq!(backoff.delay(1), Duration::from_millis(500));
        assert_eq!(backoff.delay(3), Duration::from_millis(500));
    }
}
