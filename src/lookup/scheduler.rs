//! Sweep scheduling and on-demand checks
//!
//! A sweep walks every configured domain in order, one at a time:
//!
//! 1. Sleep `request_delay`
//! 2. Run the check under the sweep [`RetryPolicy`], taking a rate limiter
//!    permit for every attempt
//! 3. Hand the result to the [`MetricsSink`]
//!
//! At most one sweep runs at a time. On-demand checks skip the sweep state
//! but share the rate limiter and metrics, so they may overlap a sweep.

use crate::lookup::checker::DomainChecker;
use crate::lookup::rate_limiter::{RateLimiter, RateLimiterStats};
use crate::lookup::retry::RetryPolicy;
use crate::metrics::MetricsSink;
use crate::state::{CheckResult, CheckStatus, SweepGuard, SweepState};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Counts and timing of one completed sweep
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepSummary {
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub success: usize,
    pub not_found: usize,
    pub parse_error: usize,
    pub error: usize,
}

impl SweepSummary {
    fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            elapsed: Duration::ZERO,
            success: 0,
            not_found: 0,
            parse_error: 0,
            error: 0,
        }
    }

    fn count(&mut self, status: CheckStatus) {
        match status {
            CheckStatus::Success => self.success += 1,
            CheckStatus::NotFound => self.not_found += 1,
            CheckStatus::ParseError => self.parse_error += 1,
            CheckStatus::Error => self.error += 1,
        }
    }

    /// Number of domains checked
    pub fn total(&self) -> usize {
        self.success + self.not_found + self.parse_error + self.error
    }
}

impl fmt::Display for SweepSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} domain(s) in {:.1}s: {} registered, {} not registered, {} parse error(s), {} failed",
            self.total(),
            self.elapsed.as_secs_f64(),
            self.success,
            self.not_found,
            self.parse_error,
            self.error
        )
    }
}

/// Result of asking for a sweep
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepOutcome {
    Completed(SweepSummary),
    /// Another sweep held the running state; nothing was checked
    AlreadyRunning,
}

/// Wraps a checker so every attempt waits for a rate limiter permit
struct RateLimitedChecker<'a> {
    inner: &'a dyn DomainChecker,
    limiter: &'a RateLimiter,
}

#[async_trait]
impl<'a> DomainChecker for RateLimitedChecker<'a> {
    async fn check(&self, domain: &str) -> CheckResult {
        let _permit = self.limiter.acquire().await;
        self.inner.check(domain).await
    }
}

/// Drives periodic sweeps and on-demand checks
pub struct Scheduler {
    domains: Vec<String>,
    request_delay: Duration,
    checker: Arc<dyn DomainChecker>,
    rate_limiter: Arc<RateLimiter>,
    metrics: Arc<MetricsSink>,
    sweep_retry: RetryPolicy,
    on_demand_retry: RetryPolicy,
    sweep_state: Arc<SweepState>,
}

impl Scheduler {
    /// Creates a scheduler with default retry policies (3 retries each)
    pub fn new(
        domains: Vec<String>,
        request_delay: Duration,
        checker: Arc<dyn DomainChecker>,
        rate_limiter: Arc<RateLimiter>,
        metrics: Arc<MetricsSink>,
    ) -> Self {
        Self {
            domains,
            request_delay,
            checker,
            rate_limiter,
            metrics,
            sweep_retry: RetryPolicy::sweep(3),
            on_demand_retry: RetryPolicy::on_demand(3),
            sweep_state: Arc::new(SweepState::new()),
        }
    }

    pub fn with_retry_policies(mut self, sweep: RetryPolicy, on_demand: RetryPolicy) -> Self {
        self.sweep_retry = sweep;
        self.on_demand_retry = on_demand;
        self
    }

    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    pub fn is_running(&self) -> bool {
        self.sweep_state.is_running()
    }

    pub fn rate_limiter_stats(&self) -> RateLimiterStats {
        self.rate_limiter.stats()
    }

    fn limited(&self) -> RateLimitedChecker<'_> {
        RateLimitedChecker {
            inner: self.checker.as_ref(),
            limiter: &self.rate_limiter,
        }
    }

    /// Runs one sweep to completion unless one is already running
    ///
    /// A rejected call returns [`SweepOutcome::AlreadyRunning`] immediately
    /// without touching any domain.
    pub async fn start_sweep(&self) -> SweepOutcome {
        match self.sweep_state.try_start() {
            Some(guard) => SweepOutcome::Completed(self.run_sweep(guard).await),
            None => {
                tracing::warn!("Sweep already in progress, skipping");
                SweepOutcome::AlreadyRunning
            }
        }
    }

    /// Starts a sweep in the background
    ///
    /// # Returns
    ///
    /// `true` if a sweep was started, `false` if one was already running.
    pub fn trigger_sweep(self: &Arc<Self>) -> bool {
        let Some(guard) = self.sweep_state.try_start() else {
            tracing::warn!("Sweep already in progress, ignoring trigger");
            return false;
        };

        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            scheduler.run_sweep(guard).await;
        });
        true
    }

    /// Checks every configured domain; `_guard` keeps the state `Running`
    async fn run_sweep(&self, _guard: SweepGuard) -> SweepSummary {
        let mut summary = SweepSummary::new(Utc::now());
        let start = Instant::now();

        tracing::info!("Starting sweep of {} domain(s)", self.domains.len());

        let checker = self.limited();
        for domain in &self.domains {
            if !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }

            let result = self.sweep_retry.check_with_retry(&checker, domain).await;
            summary.count(result.status());
            self.metrics.record(domain, &result);
        }

        summary.elapsed = start.elapsed();
        tracing::info!("Sweep complete: {}", summary);
        tracing::debug!("Rate limiter after sweep: {}", self.rate_limiter.stats());

        summary
    }

    /// Checks a single domain immediately
    ///
    /// Does not consult the sweep state, so it may run alongside a sweep.
    /// The result is always recorded to metrics before it is returned.
    pub async fn check_domain(&self, domain: &str) -> CheckResult {
        tracing::info!("On-demand check for {}", domain);

        let result = self
            .on_demand_retry
            .check_with_retry(&self.limited(), domain)
            .await;
        self.metrics.record(domain, &result);

        result
    }

    /// Sweeps forever: immediately, then `interval` after each sweep ends
    pub async fn run_periodic(self: Arc<Self>, interval: Duration) {
        tracing::info!("Periodic sweeps every {:?}", interval);

        loop {
            if let SweepOutcome::AlreadyRunning = self.start_sweep().await {
                tracing::debug!("Periodic sweep skipped; a triggered sweep is running");
            }
            tokio::time::sleep(interval).await;
        }
    }
}
