use std::time::Duration;

use crate::types::constants::MAX_BACKOFF_DELAY;

/// Exponential backoff schedule for reconnection attempts.
///
/// The delay before attempt `n` is `base * 2^(n-1)`, capped at
/// [`MAX_BACKOFF_DELAY`].
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    base_ms: u64,
    cap_ms: u64,
}

impl Backoff {
    pub fn new(base_ms: u64) -> Self {
        Self {
            base_ms,
            cap_ms: MAX_BACKOFF_DELAY,
        }
    }

    /// Delay before the given 1-based attempt number.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.max(1) - 1;
        let factor = 2u64.saturating_pow(exponent);
        let delay = self.base_ms.saturating_mul(factor).min(self.cap_ms);
        Duration::from_millis(delay)
    }
}
