//! Reconnect delay policy.

use clinicbridge_core::config::{ReconnectConfig, ReconnectStrategy};
use rand::Rng;
use std::time::Duration;

/// Maximum jitter as a fraction of the computed delay.
const JITTER_FRACTION: f64 = 0.2;

/// Computes the wait before each reconnect attempt.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    strategy: ReconnectStrategy,
    delay: Duration,
    max_delay: Duration,
    jitter: bool,
}

impl ReconnectPolicy {
    /// Same delay before every attempt.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            strategy: ReconnectStrategy::Fixed,
            delay,
            max_delay: delay,
            jitter: false,
        }
    }

    /// Doubling delay starting at `delay`, capped at `max_delay`.
    pub fn exponential(delay: Duration, max_delay: Duration) -> Self {
        Self {
            strategy: ReconnectStrategy::Exponential,
            delay,
            max_delay: max_delay.max(delay),
            jitter: false,
        }
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay before attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = match self.strategy {
            ReconnectStrategy::Fixed => self.delay,
            ReconnectStrategy::Exponential => {
                let exp = attempt.saturating_sub(1).min(31);
                self.delay
                    .checked_mul(1u32 << exp)
                    .unwrap_or(self.max_delay)
                    .min(self.max_delay)
            }
        };

        if self.jitter {
            let extra = rand::thread_rng().gen_range(0.0..=JITTER_FRACTION);
            base + base.mul_f64(extra)
        } else {
            base
        }
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from(&ReconnectConfig::default())
    }
}

impl From<&ReconnectConfig> for ReconnectPolicy {
    fn from(config: &ReconnectConfig) -> Self {
        let delay = Duration::from_secs(config.delay_secs);
        let policy = match config.strategy {
            ReconnectStrategy::Fixed => Self::fixed(delay),
            ReconnectStrategy::Exponential => {
                Self::exponential(delay, Duration::from_secs(config.max_delay_secs))
            }
        };
        policy.with_jitter(config.jitter)
    }
}
