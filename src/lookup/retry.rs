//! Retry logic with backoff for transport failures
//!
//! Only [`CheckResult::TransportError`] is retried. A `NotFound` or
//! `ParseError` is a definitive answer from the lookup site and asking again
//! would only spend rate-limit budget.

use crate::lookup::checker::DomainChecker;
use crate::state::CheckResult;
use std::time::Duration;
use tracing::{debug, warn};

/// How the delay grows between retries
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// delay = initial * multiplier^(retry - 1)
    Exponential { multiplier: f64 },
    /// delay = initial * retry
    Linear,
}

/// Configuration for retrying transport failures
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first call
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::sweep(3)
    }
}

impl RetryPolicy {
    /// Policy used by scheduled sweeps: 5 s doubling up to 30 s
    pub fn sweep(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(30),
            backoff: Backoff::Exponential { multiplier: 2.0 },
        }
    }

    /// Policy used by on-demand checks: 3 s growing linearly
    pub fn on_demand(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::from_secs(3),
            max_delay: Duration::from_secs(30),
            backoff: Backoff::Linear,
        }
    }

    /// A policy that makes exactly one call
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Switches to exponential backoff with the given multiplier (at least 1.0)
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff = Backoff::Exponential {
            multiplier: multiplier.max(1.0),
        };
        self
    }

    /// Delay before retry number `retry` (1-indexed)
    ///
    /// The exponent is capped internally so large retry counts cannot
    /// overflow the float computation.
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let retry = retry.max(1);
        let initial_ms = self.initial_delay.as_millis() as f64;

        let delay_ms = match self.backoff {
            Backoff::Exponential { multiplier } => {
                let exponent = (retry - 1).min(20) as i32;
                initial_ms * multiplier.powi(exponent)
            }
            Backoff::Linear => initial_ms * retry.min(1_000_000) as f64,
        };

        let capped = delay_ms.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }

    /// Runs `checker` for `domain`, retrying transport failures
    ///
    /// # Returns
    ///
    /// The first terminal result, or the last `TransportError` once
    /// `max_retries` retries have been spent. At most `max_retries + 1`
    /// calls are made.
    pub async fn check_with_retry(&self, checker: &dyn DomainChecker, domain: &str) -> CheckResult {
        let mut retry = 0;

        loop {
            let result = checker.check(domain).await;

            if !result.is_retryable() {
                if retry > 0 {
                    debug!(domain = %domain, retries = retry, "Check settled after retry");
                }
                return result;
            }

            if retry >= self.max_retries {
                if self.max_retries > 0 {
                    warn!(
                        domain = %domain,
                        attempts = retry + 1,
                        result = %result,
                        "Retries exhausted"
                    );
                }
                return result;
            }

            retry += 1;
            let delay = self.delay_for_retry(retry);
            warn!(
                domain = %domain,
                retry = retry,
                max_retries = self.max_retries,
                delay_ms = delay.as_millis() as u64,
                result = %result,
                "Check failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::RegistrationRecord;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Replays a fixed sequence of results, repeating the last one
    struct ScriptedChecker {
        script: Mutex<VecDeque<CheckResult>>,
        calls: AtomicU32,
    }

    impl ScriptedChecker {
        fn new(script: Vec<CheckResult>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DomainChecker for ScriptedChecker {
        async fn check(&self, _domain: &str) -> CheckResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                script.pop_front().unwrap()
            } else {
                script.front().cloned().unwrap()
            }
        }
    }

    fn success() -> CheckResult {
        CheckResult::success(vec![RegistrationRecord::new(
            "1",
            "示例公司",
            "企业",
            "京ICP备1号",
            "示例",
            "www.example.cn",
            "2023-01-01",
        )])
        .unwrap()
    }

    #[test]
    fn test_sweep_delays() {
        let policy = RetryPolicy::sweep(5);
        assert_eq!(policy.delay_for_retry(1), Duration::from_secs(5));
        assert_eq!(policy.delay_for_retry(2), Duration::from_secs(10));
        assert_eq!(policy.delay_for_retry(3), Duration::from_secs(20));
        assert_eq!(policy.delay_for_retry(4), Duration::from_secs(30));
        assert_eq!(policy.delay_for_retry(100), Duration::from_secs(30));
    }

    #[test]
    fn test_on_demand_delays_are_linear() {
        let policy = RetryPolicy::on_demand(3);
        assert_eq!(policy.delay_for_retry(1), Duration::from_secs(3));
        assert_eq!(policy.delay_for_retry(2), Duration::from_secs(6));
        assert_eq!(policy.delay_for_retry(3), Duration::from_secs(9));
        assert_eq!(policy.delay_for_retry(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn test_builder() {
        let policy = RetryPolicy::no_retry()
            .with_max_retries(2)
            .with_initial_delay(Duration::from_millis(10))
            .with_max_delay(Duration::from_millis(15))
            .with_multiplier(0.5);

        assert_eq!(policy.max_retries, 2);
        assert_eq!(policy.backoff, Backoff::Exponential { multiplier: 1.0 });
        assert_eq!(policy.delay_for_retry(5), Duration::from_millis(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_transport_errors() {
        let checker = ScriptedChecker::new(vec![
            CheckResult::transport_error("timeout"),
            CheckResult::transport_error("timeout"),
            success(),
        ]);

        let result = RetryPolicy::sweep(3).check_with_retry(&checker, "example.cn").await;

        assert!(result.is_success());
        assert_eq!(checker.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_returns_last_error() {
        let checker = ScriptedChecker::new(vec![
            CheckResult::transport_error("first"),
            CheckResult::transport_error("second"),
            CheckResult::transport_error("third"),
        ]);

        let start = tokio::time::Instant::now();
        let result = RetryPolicy::sweep(2).check_with_retry(&checker, "example.cn").await;

        assert_eq!(result, CheckResult::transport_error("third"));
        assert_eq!(checker.calls(), 3);
        // 5 s + 10 s of backoff
        assert_eq!(start.elapsed().as_secs(), 15);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_results_not_retried() {
        for terminal in [
            CheckResult::not_found("none"),
            CheckResult::parse_error("layout changed"),
            success(),
        ] {
            let checker = ScriptedChecker::new(vec![terminal.clone()]);
            let result = RetryPolicy::sweep(3).check_with_retry(&checker, "example.cn").await;
            assert_eq!(result, terminal);
            assert_eq!(checker.calls(), 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_retries_makes_one_call() {
        let checker = ScriptedChecker::new(vec![CheckResult::transport_error("down")]);
        let result = RetryPolicy::no_retry().check_with_retry(&checker, "example.cn").await;

        assert!(result.is_retryable());
        assert_eq!(checker.calls(), 1);
    }
}
