//! Sliding-window admission control for the gateway
//!
//! Every request passes this gate before any provider is contacted. Each
//! caller identity gets two independent trailing windows (one minute, one
//! hour); a request is admitted only when both windows have room.

mod error;

pub use error::RateLimitError;

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use relay_config::RateLimitConfig;

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(3600);

#[derive(Default)]
struct RateWindows {
    minute: VecDeque<Instant>,
    hour: VecDeque<Instant>,
}

/// Per-identity request rate limiter
///
/// Windows are created lazily per identity and never persisted; state is
/// local to one gateway instance.
pub struct RequestLimiter {
    windows: DashMap<String, RateWindows>,
    config: RateLimitConfig,
}

impl RequestLimiter {
    /// Create from configuration
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            windows: DashMap::new(),
            config,
        }
    }

    /// Check whether a request from `identity` is admitted
    ///
    /// Admission appends the current timestamp to both windows. Always
    /// admits with no side effects when rate limiting is disabled.
    ///
    /// # Errors
    ///
    /// Returns `RateLimitError::Exceeded` with a retry-after hint when
    /// either window is at capacity
    pub fn check(&self, identity: &str) -> Result<(), RateLimitError> {
        self.check_at(identity, Instant::now())
    }

    /// Clear both windows for an identity
    pub fn reset(&self, identity: &str) {
        self.windows.remove(identity);
    }

    fn check_at(&self, identity: &str, now: Instant) -> Result<(), RateLimitError> {
        if !self.config.enabled {
            return Ok(());
        }

        let mut entry = self.windows.entry(identity.to_owned()).or_default();
        prune(&mut entry.minute, now, MINUTE);
        prune(&mut entry.hour, now, HOUR);

        // The blocking window determines the retry-after hint
        if entry.minute.len() >= self.config.per_minute as usize {
            let retry_after = retry_after(&entry.minute, now, MINUTE);
            drop(entry);
            tracing::debug!(identity, retry_after, "minute window exhausted");
            return Err(RateLimitError::Exceeded { retry_after });
        }

        if entry.hour.len() >= self.config.per_hour as usize {
            let retry_after = retry_after(&entry.hour, now, HOUR);
            drop(entry);
            tracing::debug!(identity, retry_after, "hour window exhausted");
            return Err(RateLimitError::Exceeded { retry_after });
        }

        entry.minute.push_back(now);
        entry.hour.push_back(now);
        Ok(())
    }
}

/// Drop timestamps that have aged out of the window
fn prune(window: &mut VecDeque<Instant>, now: Instant, length: Duration) {
    while let Some(oldest) = window.front() {
        if now.duration_since(*oldest) >= length {
            window.pop_front();
        } else {
            break;
        }
    }
}

/// Seconds until the oldest entry in a full window expires, rounded up
/// by one so the caller never retries a second too early
fn retry_after(window: &VecDeque<Instant>, now: Instant, length: Duration) -> u64 {
    window.front().map_or(1, |oldest| {
        let remaining = length.saturating_sub(now.duration_since(*oldest));
        remaining.as_secs() + 1
    })
}
