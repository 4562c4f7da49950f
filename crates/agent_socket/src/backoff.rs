use std::time::Duration;

use rand::Rng;

/// Reconnect delay policy: capped exponential growth plus random jitter.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    /// Delay before the first retry.
    pub base: Duration,
    /// Upper bound on the exponential component.
    pub cap: Duration,
    /// Exclusive upper bound on the random jitter added to every delay.
    pub jitter: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            cap: Duration::from_secs(30),
            jitter: Duration::from_millis(250),
        }
    }
}

impl BackoffPolicy {
    /// Policy with no jitter, for deterministic delay assertions.
    #[must_use]
    pub fn without_jitter(mut self) -> Self {
        self.jitter = Duration::ZERO;
        self
    }

    /// Delay before reconnect attempt `attempt` (1-based):
    /// `min(base * 2^(attempt-1), cap) + jitter`.
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(30);
        let base_ms = self.base.as_millis() as u64;
        let scaled = base_ms.saturating_mul(2u64.saturating_pow(exponent));
        let bounded = scaled.min(self.cap.as_millis() as u64);
        Duration::from_millis(bounded + self.jitter_ms())
    }

    fn jitter_ms(&self) -> u64 {
        let bound = self.jitter.as_millis() as u64;
        if bound == 0 {
            0
        } else {
            rand::rng().random_range(0..bound)
        }
    }
}
