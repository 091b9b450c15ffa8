//! Lookup module for Beian-Exporter
//!
//! This module contains the check pipeline:
//! - Identity: randomized browser fingerprint per request
//! - Fetcher: one HTTP GET against the lookup site
//! - Parser: registration records from the returned page
//! - Checker: fetch followed by parse for a single domain
//! - RetryPolicy: backoff over transport failures
//! - RateLimiter: process-wide sliding-window and burst limits
//! - Scheduler: periodic sweeps and on-demand checks

mod checker;
mod fetcher;
mod identity;
mod parser;
mod rate_limiter;
mod retry;
mod scheduler;

pub use checker::{Checker, DomainChecker};
pub use fetcher::{
    build_http_client, Fetcher, HttpResponse, HttpTransport, PreFetchDelay, ReqwestTransport,
    TransportError,
};
pub use identity::{BrowserIdentity, IdentityGenerator, RequestIdentity, StaticIdentity};
pub use parser::{parse_records, RegexParser, ResponseParser};
pub use rate_limiter::{RateLimiter, RateLimiterStats, RatePermit};
pub use retry::{Backoff, RetryPolicy};
pub use scheduler::{Scheduler, SweepOutcome, SweepSummary};
