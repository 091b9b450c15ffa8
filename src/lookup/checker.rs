//! Single-domain check: fetch then parse

use crate::lookup::fetcher::Fetcher;
use crate::lookup::parser::ResponseParser;
use crate::state::CheckResult;
use async_trait::async_trait;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

/// Anything that can produce one [`CheckResult`] for a domain
#[async_trait]
pub trait DomainChecker: Send + Sync {
    async fn check(&self, domain: &str) -> CheckResult;
}

/// Checks a domain by fetching its lookup page and parsing the response
pub struct Checker {
    fetcher: Fetcher,
    parser: Arc<dyn ResponseParser>,
    timeout: Duration,
}

impl Checker {
    pub fn new(fetcher: Fetcher, parser: Arc<dyn ResponseParser>, timeout: Duration) -> Self {
        Self {
            fetcher,
            parser,
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn parse(&self, body: &str) -> CheckResult {
        catch_unwind(AssertUnwindSafe(|| self.parser.parse(body))).unwrap_or_else(|_| {
            CheckResult::parse_error("response parser panicked on this page")
        })
    }
}

#[async_trait]
impl DomainChecker for Checker {
    async fn check(&self, domain: &str) -> CheckResult {
        let body = match self.fetcher.fetch(domain, self.timeout).await {
            Ok(body) => body,
            Err(e) => {
                tracing::error!("Lookup for {} failed: {}", domain, e);
                return CheckResult::transport_error(e.to_string());
            }
        };

        let result = self.parse(&body);

        match &result {
            CheckResult::Success { records } => {
                let first = records.first();
                tracing::info!(
                    "{}: registered as {} ({}), {} record(s)",
                    domain,
                    first.registration_number(),
                    first.operator_name(),
                    records.len()
                );
            }
            CheckResult::NotFound { .. } => {
                tracing::info!("{}: no registration found", domain);
            }
            CheckResult::ParseError { message } => {
                tracing::warn!("{}: could not parse lookup page: {}", domain, message);
            }
            CheckResult::TransportError { message } => {
                tracing::error!("{}: {}", domain, message);
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::fetcher::{HttpResponse, HttpTransport, PreFetchDelay, TransportError};
    use crate::lookup::identity::StaticIdentity;
    use crate::lookup::parser::RegexParser;
    use crate::state::CheckStatus;
    use std::sync::atomic::{AtomicU32, Ordering};
    use url::Url;

    struct FixedTransport(Result<HttpResponse, TransportError>);

    #[async_trait]
    impl HttpTransport for FixedTransport {
        async fn get(
            &self,
            _url: &Url,
            _headers: &[(String, String)],
            _timeout: Duration,
        ) -> Result<HttpResponse, TransportError> {
            self.0.clone()
        }
    }

    struct CountingParser {
        calls: AtomicU32,
    }

    impl ResponseParser for CountingParser {
        fn parse(&self, _body: &str) -> CheckResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            CheckResult::not_found("none")
        }
    }

    struct PanickingParser;

    impl ResponseParser for PanickingParser {
        fn parse(&self, _body: &str) -> CheckResult {
            panic!("unexpected markup");
        }
    }

    fn checker(
        response: Result<HttpResponse, TransportError>,
        parser: Arc<dyn ResponseParser>,
    ) -> Checker {
        let fetcher = Fetcher::new(
            Arc::new(FixedTransport(response)),
            Arc::new(StaticIdentity::default()),
            Url::parse("https://lookup.test/search/").unwrap(),
        )
        .with_pre_fetch_delay(PreFetchDelay::none());
        Checker::new(fetcher, parser, Duration::from_secs(5))
    }

    fn ok(body: &str) -> Result<HttpResponse, TransportError> {
        Ok(HttpResponse {
            status: 200,
            body: body.to_string(),
        })
    }

    #[tokio::test]
    async fn test_not_found_page() {
        let checker = checker(ok("<p>没有找到</p>"), Arc::new(RegexParser::new()));
        let result = checker.check("example.cn").await;
        assert_eq!(result.status(), CheckStatus::NotFound);
    }

    #[tokio::test]
    async fn test_transport_failure_skips_parser() {
        let parser = Arc::new(CountingParser {
            calls: AtomicU32::new(0),
        });
        let checker = checker(
            Err(TransportError::Connect("refused".to_string())),
            parser.clone(),
        );

        let result = checker.check("example.cn").await;
        assert!(result.is_retryable());
        assert!(result.message().unwrap().contains("refused"));
        assert_eq!(parser.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_http_error_status_is_transport_error() {
        let parser = Arc::new(CountingParser {
            calls: AtomicU32::new(0),
        });
        let checker = checker(
            Ok(HttpResponse {
                status: 502,
                body: String::new(),
            }),
            parser.clone(),
        );

        assert_eq!(checker.check("example.cn").await.status(), CheckStatus::Error);
        assert_eq!(parser.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_parser_panic_becomes_parse_error() {
        let checker = checker(ok("<html></html>"), Arc::new(PanickingParser));
        let result = checker.check("example.cn").await;
        assert_eq!(result.status(), CheckStatus::ParseError);
    }
}
