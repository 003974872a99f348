//! Connect retry policy.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Policy for retrying the initial connect of a channel.
///
/// The default is [`RetryPolicy::None`]: a failed or dropped channel
/// stays down until the caller re-opens it, matching the behavior the
/// rest of the core is designed around. Backoff is an opt-in upgrade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Never retry; reconnection is an explicit caller action.
    None,
    /// Retry the connect with doubling, capped delays.
    ExponentialBackoff {
        /// Delay before the first retry.
        base_delay: Duration,
        /// Upper bound for any single delay.
        max_delay: Duration,
        /// Number of retries after the initial attempt.
        max_retries: u32,
    },
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::None
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (one-based), or `None` when
    /// the policy is exhausted.
    pub fn delay(&self, attempt: u32) -> Option<Duration> {
        match self {
            RetryPolicy::None => None,
            RetryPolicy::ExponentialBackoff {
                base_delay,
                max_delay,
                max_retries,
            } => {
                if attempt == 0 || attempt > *max_retries {
                    return None;
                }
                let factor = 2u32.saturating_pow(attempt - 1);
                Some((*base_delay).saturating_mul(factor).min(*max_delay))
            }
        }
    }
}

/// Serialized form of [`RetryPolicy`] used in the client config file.
/// `max_retries = 0` disables retry entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_delay_ms: 500,
            max_delay_ms: 10_000,
        }
    }
}

impl From<RetryConfig> for RetryPolicy {
    fn from(config: RetryConfig) -> Self {
        if config.max_retries == 0 {
            RetryPolicy::None
        } else {
            RetryPolicy::ExponentialBackoff {
                base_delay: Duration::from_millis(config.base_delay_ms),
                max_delay: Duration::from_millis(config.max_delay_ms),
                max_retries: config.max_retries,
            }
        }
    }
}
