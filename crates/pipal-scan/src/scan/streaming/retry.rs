use core::time::Duration;

/// How a chunk fetch is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts in total, including the first.
    pub max_attempts: u32,
    /// Delay after the first failure.
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            max_attempts,
            initial_backoff,
        }
    }

    pub const fn backoff(&self) -> Backoff {
        Backoff::new(self.initial_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

/// Exponential backoff: `base`, `2 * base`, `4 * base`, ...
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    attempt: u32,
}

impl Backoff {
    pub const fn new(base: Duration) -> Self {
        Self { base, attempt: 0 }
    }

    /// Returns the next delay and advances.
    pub fn next_delay(&mut self) -> Duration {
        let factor = 1_u32.checked_shl(self.attempt).unwrap_or(u32::MAX);
        self.attempt = self.attempt.saturating_add(1);
        self.base.saturating_mul(factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_double_from_the_base() {
        let mut backoff = RetryPolicy::default().backoff();
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
        assert_eq!(backoff.next_delay(), Duration::from_secs(2));
        assert_eq!(backoff.next_delay(), Duration::from_secs(4));
    }

    #[test]
    fn delays_saturate() {
        let mut backoff = Backoff::new(Duration::from_secs(u64::MAX / 2));
        for _ in 0..40 {
            backoff.next_delay();
        }
        assert_eq!(backoff.next_delay(), Duration::MAX);
    }
}
