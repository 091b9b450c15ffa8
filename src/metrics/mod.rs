//! Metrics module for Beian-Exporter
//!
//! This module maps check outcomes onto Prometheus series:
//! - `beian_status{domain}`: 1 registered, 0 not registered, -1 check failed
//! - `beian_info{domain, company_name, ...}`: details of the first record
//! - `beian_check_errors_total{domain, error_type}`: unsuccessful checks
//! - `beian_last_check_timestamp{domain}`: unix time of the last check

mod registry;
mod sink;

pub use registry::{Labels, MemoryRegistry, MetricsRegistry, PrometheusRegistry};
pub use sink::{
    error_type, sanitize_label, status_value, MetricSnapshot, MetricsSink, ERRORS_METRIC,
    ERROR_TYPE_UNKNOWN, INFO_METRIC, LAST_CHECK_METRIC, STATUS_METRIC,
};
