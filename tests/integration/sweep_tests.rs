//! Integration tests for the check pipeline
//!
//! These tests use wiremock to stand in for the lookup site and run the
//! real reqwest transport, parser, scheduler and Prometheus registry
//! end-to-end.

use beian_exporter::config::Config;
use beian_exporter::lookup::{
    Checker, Fetcher, PreFetchDelay, RateLimiter, RegexParser, ReqwestTransport, RetryPolicy,
    Scheduler, StaticIdentity, SweepOutcome,
};
use beian_exporter::metrics::{MemoryRegistry, MetricsSink, STATUS_METRIC};
use beian_exporter::Exporter;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn record_row(serial: u32, number: &str, url: &str) -> String {
    format!(
        r#"<tr>
  <td class="text-center">{serial}</td>
  <td>示例科技有限公司</td>
  <td class="text-center">企业</td>
  <td>{number}</td>
  <td>示例网站</td>
  <td><div>{url}<i class="bi bi-box-arrow-up-right"></i></div></td>
  <td><div class="text-center">2023-05-01</div></td>
</tr>"#
    )
}

fn results_page(rows: &[String]) -> String {
    format!(
        "<html><body><table class=\"table\"><tbody>{}</tbody></table></body></html>",
        rows.join("\n")
    )
}

/// Creates a test configuration pointed at the mock server, with no delays
fn create_test_config(base_url: &str, domains: &[&str]) -> Config {
    let mut config = Config::with_domains(domains.iter().map(|d| d.to_string()).collect());
    config.lookup.base_url = format!("{}/search/", base_url);
    config.lookup.min_jitter_ms = 0;
    config.lookup.max_jitter_ms = 0;
    config.request_delay = 0;
    config.request_timeout = 5;
    config.max_retries = 0;
    config.server.listen = "127.0.0.1:0".to_string();
    config
}

fn create_test_exporter(config: Config) -> Exporter {
    Exporter::with_components(
        config,
        Arc::new(ReqwestTransport::new().expect("Failed to build HTTP client")),
        Arc::new(StaticIdentity::default()),
    )
    .expect("Failed to wire exporter")
}

#[tokio::test]
async fn test_full_sweep_mixed_outcomes() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/registered.cn"))
        .and(header_exists("x-forwarded-for"))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_page(&[
            record_row(1, "京ICP备10000001号-1", "www.registered.cn"),
            record_row(2, "京ICP备10000001号-2", "m.registered.cn"),
            record_row(3, "京ICP备10000001号-3", "api.registered.cn"),
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search/unregistered.cn"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body><p>没有找到该域名的备案信息</p></body></html>"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search/broken.cn"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search/redesigned.cn"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<html><body><ul></ul></body></html>"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(
        &mock_server.uri(),
        &["registered.cn", "unregistered.cn", "broken.cn", "redesigned.cn"],
    );
    let exporter = create_test_exporter(config);

    let before = chrono::Utc::now().timestamp();
    let SweepOutcome::Completed(summary) = exporter.scheduler().start_sweep().await else {
        panic!("Sweep should not be rejected");
    };

    assert_eq!(summary.total(), 4);
    assert_eq!(summary.success, 1);
    assert_eq!(summary.not_found, 1);
    assert_eq!(summary.error, 1);
    assert_eq!(summary.parse_error, 1);

    let snapshots = exporter.metrics().snapshots();
    assert_eq!(snapshots["registered.cn"].status, 1);
    assert_eq!(snapshots["unregistered.cn"].status, 0);
    assert_eq!(snapshots["broken.cn"].status, -1);
    assert_eq!(snapshots["redesigned.cn"].status, -1);
    for snapshot in snapshots.values() {
        assert!(snapshot.last_check.timestamp() >= before);
    }

    // Only the first record is exported
    let record = snapshots["registered.cn"].record.as_ref().unwrap();
    assert_eq!(record.registration_number(), "京ICP备10000001号-1");

    let text = exporter.registry().render().unwrap();
    assert!(text.contains("beian_number=\"京ICP备10000001号-1\""));
    assert!(!text.contains("京ICP备10000001号-2"));
    assert!(text.contains("error_type=\"query_error\""));
    assert!(text.contains("error_type=\"parse_error\""));
    assert!(text.contains("error_type=\"not_found\""));
    assert!(text.contains("beian_last_check_timestamp{"));
}

#[tokio::test]
async fn test_on_demand_check_records_metrics() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/example.cn"))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_page(&[record_row(
            1,
            "沪ICP备20000002号",
            "www.example.cn",
        )])))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), &["other.cn"]);
    let exporter = create_test_exporter(config);

    let result = exporter.scheduler().check_domain("example.cn").await;

    assert!(result.is_success());
    let snapshot = exporter.metrics().snapshot("example.cn").unwrap();
    assert_eq!(snapshot.status, 1);
    assert_eq!(
        snapshot.record.unwrap().site_url(),
        "www.example.cn"
    );
}

#[tokio::test]
async fn test_transport_error_retried_until_success() {
    let mock_server = MockServer::start().await;

    // First two calls fail, later calls succeed
    Mock::given(method("GET"))
        .and(path("/search/flaky.cn"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(2)
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search/flaky.cn"))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_page(&[record_row(
            1,
            "粤ICP备30000003号",
            "www.flaky.cn",
        )])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let base_url = url::Url::parse(&format!("{}/search/", mock_server.uri())).unwrap();
    let fetcher = Fetcher::new(
        Arc::new(ReqwestTransport::new().unwrap()),
        Arc::new(StaticIdentity::default()),
        base_url,
    )
    .with_pre_fetch_delay(PreFetchDelay::none());
    let checker = Checker::new(fetcher, Arc::new(RegexParser::new()), Duration::from_secs(5));

    let registry = Arc::new(MemoryRegistry::new());
    let scheduler = Scheduler::new(
        vec!["flaky.cn".to_string()],
        Duration::ZERO,
        Arc::new(checker),
        Arc::new(RateLimiter::new(10, 3)),
        Arc::new(MetricsSink::new(registry.clone())),
    )
    .with_retry_policies(
        RetryPolicy::sweep(3).with_initial_delay(Duration::from_millis(10)),
        RetryPolicy::on_demand(0),
    );

    let outcome = scheduler.start_sweep().await;

    let SweepOutcome::Completed(summary) = outcome else {
        panic!("Sweep should not be rejected");
    };
    assert_eq!(summary.success, 1);
    assert_eq!(
        registry.gauge(STATUS_METRIC, &[("domain", "flaky.cn")]),
        Some(1.0)
    );
    assert_eq!(scheduler.rate_limiter_stats().requests_in_last_minute, 3);
}

#[tokio::test]
async fn test_slow_lookup_times_out() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/slow.cn"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri(), &["slow.cn"]);
    config.request_timeout = 1;
    let exporter = create_test_exporter(config);

    let result = exporter.scheduler().check_domain("slow.cn").await;

    assert!(result.is_retryable());
    assert_eq!(exporter.metrics().snapshot("slow.cn").unwrap().status, -1);
}
