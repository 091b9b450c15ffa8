//! Process-wide outbound request limiter
//!
//! Two limits apply at once:
//! - at most `max_requests_per_minute` acquisitions in any trailing 60 s window
//! - at most `burst_size` permits outstanding at the same time
//!
//! A permit is released when the [`RatePermit`] is dropped, so in-flight
//! accounting stays correct however the request ends.

use crate::config::RateLimitConfig;
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

const WINDOW: Duration = Duration::from_secs(60);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Default)]
struct WindowState {
    /// Issuance times within the trailing window, oldest first
    timestamps: VecDeque<Instant>,
    in_flight: u32,
}

impl WindowState {
    fn evict_expired(&mut self, now: Instant) {
        while let Some(oldest) = self.timestamps.front() {
            if now.saturating_duration_since(*oldest) >= WINDOW {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Sliding-window plus burst limiter shared by every outbound request
#[derive(Debug)]
pub struct RateLimiter {
    state: Mutex<WindowState>,
    max_requests_per_minute: u32,
    burst_size: u32,
    poll_interval: Duration,
}

impl RateLimiter {
    /// Creates a limiter; both limits are clamped to at least 1
    pub fn new(max_requests_per_minute: u32, burst_size: u32) -> Self {
        Self {
            state: Mutex::new(WindowState::default()),
            max_requests_per_minute: max_requests_per_minute.max(1),
            burst_size: burst_size.max(1),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests_per_minute, config.burst_size)
    }

    /// Sets how often a blocked [`acquire`](Self::acquire) re-checks the limits
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn lock(&self) -> MutexGuard<'_, WindowState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Attempts to take a permit without waiting
    ///
    /// The burst limit is checked before the per-minute limit. A granted
    /// permit counts against the window immediately and against the burst
    /// limit until it is dropped.
    pub fn try_acquire(&self) -> Option<RatePermit<'_>> {
        let now = Instant::now();
        let mut state = self.lock();
        state.evict_expired(now);

        if state.in_flight >= self.burst_size {
            tracing::debug!(
                "Rate limit: burst exhausted ({}/{} in flight)",
                state.in_flight,
                self.burst_size
            );
            return None;
        }

        if state.timestamps.len() >= self.max_requests_per_minute as usize {
            tracing::debug!(
                "Rate limit: {} requests in the last minute (max {})",
                state.timestamps.len(),
                self.max_requests_per_minute
            );
            return None;
        }

        state.timestamps.push_back(now);
        state.in_flight += 1;

        Some(RatePermit { limiter: self })
    }

    /// Waits until a permit is available
    ///
    /// Polls [`try_acquire`](Self::try_acquire) every poll interval. Waiters
    /// are not queued, so there is no fairness between them.
    pub async fn acquire(&self) -> RatePermit<'_> {
        loop {
            if let Some(permit) = self.try_acquire() {
                return permit;
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    fn release(&self) {
        let mut state = self.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
    }

    /// Current usage, after evicting expired window entries
    pub fn stats(&self) -> RateLimiterStats {
        let mut state = self.lock();
        state.evict_expired(Instant::now());

        RateLimiterStats {
            requests_in_last_minute: state.timestamps.len() as u32,
            in_flight: state.in_flight,
            max_requests_per_minute: self.max_requests_per_minute,
            burst_size: self.burst_size,
        }
    }
}

/// An outstanding permission to issue one request
#[derive(Debug)]
#[must_use = "the permit is released as soon as it is dropped"]
pub struct RatePermit<'a> {
    limiter: &'a RateLimiter,
}

impl Drop for RatePermit<'_> {
    fn drop(&mut self) {
        self.limiter.release();
    }
}

/// Point-in-time view of limiter usage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimiterStats {
    pub requests_in_last_minute: u32,
    pub in_flight: u32,
    pub max_requests_per_minute: u32,
    pub burst_size: u32,
}

impl fmt::Display for RateLimiterStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "requests in last minute: {}/{}, in flight: {}/{}",
            self.requests_in_last_minute,
            self.max_requests_per_minute,
            self.in_flight,
            self.burst_size
        )
    }
}
