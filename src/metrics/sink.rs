use crate::metrics::registry::MetricsRegistry;
use crate::state::{CheckResult, CheckStatus, RegistrationRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub const STATUS_METRIC: &str = "beian_status";
pub const INFO_METRIC: &str = "beian_info";
pub const ERRORS_METRIC: &str = "beian_check_errors_total";
pub const LAST_CHECK_METRIC: &str = "beian_last_check_timestamp";

const STATUS_HELP: &str = "ICP registration status (1 = registered, 0 = not registered, -1 = check failed)";
const INFO_HELP: &str = "ICP registration details of the first record for the domain";
const ERRORS_HELP: &str = "Total number of unsuccessful registration checks";
const LAST_CHECK_HELP: &str = "Unix timestamp of the last completed check";

/// Error type for classifications the sink does not recognise
pub const ERROR_TYPE_UNKNOWN: &str = "unknown";

/// Makes a value safe to use as a label
///
/// Trims surrounding whitespace, drops `"` and `\`, and turns newlines and
/// tabs into spaces.
pub fn sanitize_label(value: &str) -> String {
    value
        .trim()
        .chars()
        .filter(|c| *c != '"' && *c != '\\')
        .map(|c| match c {
            '\n' | '\r' | '\t' => ' ',
            other => other,
        })
        .collect()
}

/// Label value for a domain; domains are case-insensitive
fn domain_label(domain: &str) -> String {
    sanitize_label(domain).to_lowercase()
}

/// Numeric value exported as `beian_status`
pub fn status_value(status: CheckStatus) -> i64 {
    match status {
        CheckStatus::Success => 1,
        CheckStatus::NotFound => 0,
        CheckStatus::ParseError | CheckStatus::Error => -1,
    }
}

/// `error_type` label for an unsuccessful check
pub fn error_type(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::NotFound => "not_found",
        CheckStatus::ParseError => "parse_error",
        CheckStatus::Error => "query_error",
        // successes are never counted as errors
        CheckStatus::Success => ERROR_TYPE_UNKNOWN,
    }
}

/// Sanitized label values of an exported `beian_info` series
#[derive(Debug, Clone, PartialEq, Eq)]
struct InfoLabels {
    domain: String,
    company_name: String,
    company_type: String,
    beian_number: String,
    website_name: String,
    website_url: String,
    approval_date: String,
}

impl InfoLabels {
    fn new(domain: &str, record: &RegistrationRecord) -> Self {
        Self {
            domain: domain.to_string(),
            company_name: sanitize_label(record.operator_name()),
            company_type: sanitize_label(record.operator_type()),
            beian_number: sanitize_label(record.registration_number()),
            website_name: sanitize_label(record.site_name()),
            website_url: sanitize_label(record.site_url()),
            approval_date: sanitize_label(record.approval_date()),
        }
    }

    fn pairs(&self) -> [(&'static str, &str); 7] {
        [
            ("domain", self.domain.as_str()),
            ("company_name", self.company_name.as_str()),
            ("company_type", self.company_type.as_str()),
            ("beian_number", self.beian_number.as_str()),
            ("website_name", self.website_name.as_str()),
            ("website_url", self.website_url.as_str()),
            ("approval_date", self.approval_date.as_str()),
        ]
    }
}

/// Last exported state of one domain
#[derive(Debug, Clone, Serialize)]
pub struct MetricSnapshot {
    /// 1, 0 or -1, as exported in `beian_status`
    pub status: i64,
    /// First record of the last successful check, cleared by any other outcome
    pub record: Option<RegistrationRecord>,
    pub last_check: DateTime<Utc>,
    /// Error counts keyed by `error_type`
    pub errors: BTreeMap<String, u64>,
    #[serde(skip)]
    info: Option<InfoLabels>,
}

/// Maps check outcomes onto exported series
///
/// Each call to [`record`](MetricsSink::record) updates the status gauge,
/// the info gauge (successes only), the error counter (everything else) and
/// the last-check timestamp. All four updates for one call happen under the
/// same lock, so concurrent records of one domain never interleave.
pub struct MetricsSink {
    registry: Arc<dyn MetricsRegistry>,
    snapshots: Mutex<HashMap<String, MetricSnapshot>>,
}

impl MetricsSink {
    pub fn new(registry: Arc<dyn MetricsRegistry>) -> Self {
        Self {
            registry,
            snapshots: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, MetricSnapshot>> {
        self.snapshots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records the outcome of one completed check
    pub fn record(&self, domain: &str, result: &CheckResult) {
        let domain = domain_label(domain);
        let now = Utc::now();
        let status = result.status();
        let value = status_value(status);

        let mut snapshots = self.lock();
        let snapshot = snapshots
            .entry(domain.clone())
            .or_insert_with(|| MetricSnapshot {
                status: value,
                record: None,
                last_check: now,
                errors: BTreeMap::new(),
                info: None,
            });

        self.registry
            .set_gauge(STATUS_METRIC, STATUS_HELP, &[("domain", domain.as_str())], value as f64);

        match result {
            CheckResult::Success { records } => {
                let first = records.first();
                let info = InfoLabels::new(&domain, first);

                if let Some(previous) = snapshot.info.as_ref().filter(|p| **p != info) {
                    self.registry.remove_gauge(INFO_METRIC, &previous.pairs());
                }
                self.registry
                    .set_gauge(INFO_METRIC, INFO_HELP, &info.pairs(), 1.0);

                snapshot.info = Some(info);
                snapshot.record = Some(first.clone());
            }
            _ => {
                let error_type = error_type(status);
                self.registry.increment_counter(
                    ERRORS_METRIC,
                    ERRORS_HELP,
                    &[("domain", domain.as_str()), ("error_type", error_type)],
                );
                *snapshot.errors.entry(error_type.to_string()).or_insert(0) += 1;
                snapshot.record = None;
            }
        }

        self.registry.set_gauge(
            LAST_CHECK_METRIC,
            LAST_CHECK_HELP,
            &[("domain", domain.as_str())],
            now.timestamp() as f64,
        );

        snapshot.status = value;
        snapshot.last_check = now;

        tracing::debug!("Recorded {} for {} (status {})", status, domain, value);
    }

    pub fn snapshot(&self, domain: &str) -> Option<MetricSnapshot> {
        self.lock().get(&domain_label(domain)).cloned()
    }

    /// All snapshots, ordered by domain
    pub fn snapshots(&self) -> BTreeMap<String, MetricSnapshot> {
        self.lock()
            .iter()
            .map(|(domain, snapshot)| (domain.clone(), snapshot.clone()))
            .collect()
    }
}
