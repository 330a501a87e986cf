//! Retry delay schedule for reconnecting sessions.

use std::time::Duration;

use rand::Rng;

use crate::BackoffConfig;

/// Doubling cap; beyond this the delay is pinned at `max_ms` anyway.
const MAX_SHIFT: u32 = 20;

/// Per-session retry state. Private to the session task.
#[derive(Debug, Clone)]
pub(crate) struct Backoff {
    config: BackoffConfig,
    attempt: u32,
}

impl Backoff {
    pub(crate) fn new(config: BackoffConfig) -> Self {
        Self {
            config: config.validated(),
            attempt: 0,
        }
    }

    /// Delay before the next retry; each call doubles the base delay.
    pub(crate) fn next_delay(&mut self) -> Duration {
        let shift = self.attempt.min(MAX_SHIFT);
        let base = self
            .config
            .initial_ms
            .saturating_mul(1u64 << shift)
            .min(self.config.max_ms);
        self.attempt = self.attempt.saturating_add(1);

        let jitter = if self.config.jitter_ms > 0 {
            rand::rng().random_range(0..=self.config.jitter_ms)
        } else {
            0
        };
        Duration::from_millis(base.saturating_add(jitter))
    }

    /// Starts the schedule over, after a successful connect.
    pub(crate) fn reset(&mut self) {
        self.attempt = 0;
    }

    pub(crate) fn attempt(&self) -> u32 {
        self.attempt
    }
}
