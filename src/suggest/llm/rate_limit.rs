//! Outbound throttling for OpenRouter calls
//!
//! Two limits apply: a minimum spacing between consecutive calls and a cap on
//! calls inside a trailing window. Free-tier models reject bursts, so waiting
//! locally is cheaper than eating a 429 and falling back.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

const DEFAULT_MIN_INTERVAL_MS: u64 = 3_000;
const DEFAULT_WINDOW_MS: u64 = 60_000;
const DEFAULT_MAX_REQUESTS: usize = 10;

/// Limits applied by [`RateLimiter`]. Stored in milliseconds so it reads
/// naturally in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitPolicy {
    pub min_interval_ms: u64,
    pub window_ms: u64,
    pub max_requests: usize,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            min_interval_ms: DEFAULT_MIN_INTERVAL_MS,
            window_ms: DEFAULT_WINDOW_MS,
            max_requests: DEFAULT_MAX_REQUESTS,
        }
    }
}

impl RateLimitPolicy {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

#[derive(Debug, Default)]
struct LimiterState {
    last_request: Option<Instant>,
    /// Calls inside the trailing window, oldest first.
    timestamps: VecDeque<Instant>,
}

impl LimiterState {
    fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(&oldest) = self.timestamps.front() {
            if now.duration_since(oldest) >= window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Gate in front of every remote call.
///
/// The state lock is held across the induced waits, so concurrent callers
/// queue behind each other instead of all observing the same free slot.
#[derive(Debug, Default)]
pub struct RateLimiter {
    policy: RateLimitPolicy,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self {
            policy,
            state: Mutex::new(LimiterState::default()),
        }
    }

    /// Wait until one more call is allowed, then record it.
    pub async fn acquire(&self) {
        let mut state = self.state.lock().await;
        let window = self.policy.window();

        let now = Instant::now();
        state.prune(now, window);

        if state.timestamps.len() >= self.policy.max_requests {
            if let Some(&oldest) = state.timestamps.front() {
                let wait = window.saturating_sub(now.duration_since(oldest));
                if !wait.is_zero() {
                    warn!(
                        wait_secs = wait.as_secs_f64().ceil(),
                        max_requests = self.policy.max_requests,
                        window_secs = window.as_secs(),
                        "Rate limit: waiting for the request window to free up"
                    );
                    sleep(wait).await;
                }
            }
        }

        let now = Instant::now();
        if let Some(last) = state.last_request {
            let since = now.duration_since(last);
            let min_interval = self.policy.min_interval();
            if since < min_interval {
                let wait = min_interval - since;
                debug!(wait_ms = wait.as_millis() as u64, "Throttling before next request");
                sleep(wait).await;
            }
        }

        let now = Instant::now();
        state.prune(now, window);
        state.last_request = Some(now);
        state.timestamps.push_back(now);
    }

    /// Calls currently counted against the window.
    #[cfg(test)]
    async fn in_window(&self) -> usize {
        let mut state = self.state.lock().await;
        state.prune(Instant::now(), self.policy.window());
        state.timestamps.len()
    }
}
