use std::time::Duration;

/// Attempts made by the WebSocket transport when opening or writing.
pub const TRANSPORT_MAX_RETRIES: u32 = 3;

/// Attempts made by the aggregator for each remote or local source.
pub const AGGREGATION_MAX_RETRIES: u32 = 10;

/// Fixed pause between two attempts. No jitter is applied.
pub const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Bounded retry with a fixed delay between strictly sequential attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first; zero behaves like one
    pub max_attempts: u32,
    /// Pause after each failed attempt except the last
    pub delay: Duration,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Policy used for socket open and send
    pub const fn transport() -> Self {
        Self::new(TRANSPORT_MAX_RETRIES, RETRY_DELAY)
    }

    /// Policy used by `get_functions` around each toolkit
    pub const fn aggregation() -> Self {
        Self::new(AGGREGATION_MAX_RETRIES, RETRY_DELAY)
    }

    /// Number of attempts actually performed; a zero budget still tries once.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::transport()
    }
}
