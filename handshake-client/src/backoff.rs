// handshake-client/src/backoff.rs
use std::time::Duration;

/// Bounded exponential backoff for transient challenge-issuance failures.
///
/// Doubles from `base` up to `cap`, hands out at most `max_attempts`
/// delays, then reports exhaustion so the caller can stop retrying.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    cap: Duration,
    max_attempts: u32,
    attempt: u32,
}

impl Backoff {
    pub fn new(base: Duration, cap: Duration, max_attempts: u32) -> Self {
        Self {
            base,
            cap,
            max_attempts,
            attempt: 0,
        }
    }

    /// Delay before the next retry, or `None` once the budget is spent
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt >= self.max_attempts {
            return None;
        }

        let exponent = self.attempt.min(16);
        let delay = self
            .base
            .checked_mul(2u32.saturating_pow(exponent))
            .map(|d| d.min(self.cap))
            .unwrap_or(self.cap);

        self.attempt += 1;
        Some(delay)
    }

    /// Forget accumulated failures after a success
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(2), Duration::from_secs(60), 6)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delays_double_up_to_cap() {
        let mut backoff = Backoff::new(Duration::from_secs(2), Duration::from_secs(10), 5);

        let delays: Vec<_> = std::iter::from_fn(|| backoff.next_delay()).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(8),
                Duration::from_secs(10),
                Duration::from_secs(10),
            ]
        );
    }

    #[test]
    fn test_budget_terminates() {
        let mut backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(60), 2);
        assert!(backoff.next_delay().is_some());
        assert!(backoff.next_delay().is_some());
        assert_eq!(backoff.next_delay(), None);
        assert_eq!(backoff.next_delay(), None);
    }

    #[test]
    fn test_reset_restores_budget() {
        let mut backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(60), 1);
        assert!(backoff.next_delay().is_some());
        assert_eq!(backoff.next_delay(), None);

        backoff.reset();
        assert_eq!(backoff.next_delay(), Some(Duration::from_secs(1)));
    }
}
