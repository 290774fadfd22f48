use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use crate::transport::Transport;

/// Startup retry settings for reaching the messaging bridge
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of readiness checks (default: 5)
    pub max_retries: u32,
    /// Delay before the second check in milliseconds (default: 500ms)
    pub initial_delay_ms: u64,
    /// Upper bound for the delay between checks in milliseconds (default: 5000ms)
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay_ms: 500,
            max_delay_ms: 5000,
        }
    }
}

impl RetryConfig {
    /// Load retry configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let read = |key: &str| std::env::var(key).ok().and_then(|s| s.parse::<u64>().ok());

        Self {
            max_retries: read("BRIDGE_MAX_RETRIES")
                .map(|v| v.clamp(1, u32::MAX as u64) as u32)
                .unwrap_or(defaults.max_retries),
            initial_delay_ms: read("BRIDGE_INITIAL_DELAY_MS").unwrap_or(defaults.initial_delay_ms),
            max_delay_ms: read("BRIDGE_MAX_DELAY_MS").unwrap_or(defaults.max_delay_ms),
        }
    }

    /// Delay to wait after the given failed attempt (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let mut delay = self.initial_delay_ms;
        for _ in 1..attempt {
            delay = delay.saturating_mul(2).min(self.max_delay_ms);
        }
        Duration::from_millis(delay.min(self.max_delay_ms))
    }
}

/// Poll the transport's readiness check with exponential backoff
///
/// The bridge is usually started alongside the relay and may still be
/// restoring its session when we come up. Returns the number of attempts
/// used, or the last error once `max_retries` checks have failed.
pub async fn wait_for_bridge(transport: &dyn Transport, config: &RetryConfig) -> Result<u32> {
    let mut attempt = 0;

    loop {
        attempt += 1;

        match transport.ready().await {
            Ok(()) => {
                if attempt > 1 {
                    info!("{} ready after {} attempt(s)", transport.kind(), attempt);
                } else {
                    info!("{} ready", transport.kind());
                }
                return Ok(attempt);
            }
            Err(e) => {
                if attempt >= config.max_retries {
                    return Err(e).context(format!(
                        "{} not ready after {} attempts",
                        transport.kind(),
                        config.max_retries
                    ));
                }

                let delay = config.delay_after(attempt);
                warn!(
                    "{} readiness check {}/{} failed: {:#} - retrying in {}ms",
                    transport.kind(),
                    attempt,
                    config.max_retries,
                    e,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
