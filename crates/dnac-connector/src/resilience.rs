//! Backoff primitives shared by HTTP retries and execution polling.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Exponential backoff schedule.
///
/// `delay(0)` is the initial delay; each further attempt multiplies it by
/// `multiplier`, capped at `max`. With jitter enabled up to 25% is added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Backoff {
    /// Delay before the first retry, in milliseconds.
    #[serde(default = "default_initial_ms")]
    pub initial_ms: u64,

    /// Upper bound for a single delay, in milliseconds.
    #[serde(default = "default_max_ms")]
    pub max_ms: u64,

    /// Multiplier for exponential backoff.
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    /// Whether to add jitter to delays.
    #[serde(default = "default_jitter")]
    pub jitter: bool,
}

fn default_initial_ms() -> u64 {
    100
}

fn default_max_ms() -> u64 {
    30_000
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_jitter() -> bool {
    true
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial_ms: default_initial_ms(),
            max_ms: default_max_ms(),
            multiplier: default_multiplier(),
            jitter: default_jitter(),
        }
    }
}

impl Backoff {
    /// Create a schedule without jitter.
    #[must_use]
    pub fn fixed_ratio(initial: Duration, max: Duration, multiplier: f64) -> Self {
        Self {
            initial_ms: duration_ms(initial),
            max_ms: duration_ms(max),
            multiplier,
            jitter: false,
        }
    }

    /// Enable or disable jitter.
    #[must_use]
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    #[must_use]
    pub fn initial(&self) -> Duration {
        Duration::from_millis(self.initial_ms)
    }

    #[must_use]
    pub fn max(&self) -> Duration {
        Duration::from_millis(self.max_ms)
    }

    /// Calculate delay for a given attempt (0-indexed).
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let base_delay = self.initial_ms as f64 * self.multiplier.max(1.0).powi(exponent);

        let delay_ms = base_delay.min(self.max_ms as f64);

        let final_delay = if self.jitter {
            use rand::Rng;

            // Add up to 25% jitter
            delay_ms + rand::thread_rng().gen_range(0.0..=delay_ms * 0.25)
        } else {
            delay_ms
        };

        Duration::from_millis(final_delay as u64)
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
