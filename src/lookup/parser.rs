//! Response parser for lookup pages
//!
//! This module turns a raw HTML body into a [`CheckResult`]:
//! - Every results-table row matching the record pattern becomes a record
//! - A page without rows that carries a "not found" marker is `NotFound`
//! - Anything else is a `ParseError` (the page layout probably changed)

use crate::state::{CheckResult, RegistrationRecord};
use once_cell::sync::Lazy;
use regex::Regex;

/// One results-table row: serial, operator name, operator type,
/// registration number, site name, site URL (inside a `<div>` followed by
/// an icon) and approval date.
static ROW_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?s)<tr>.*?<td[^>]*>(\d+)</td>",
        r".*?<td[^>]*>([^<]+)</td>",
        r".*?<td[^>]*>([^<]+)</td>",
        r".*?<td[^>]*>([^<]+)</td>",
        r".*?<td[^>]*>([^<]+)</td>",
        r".*?<div>([^<]+)<i",
        r".*?<div[^>]*>(\d{4}-\d{2}-\d{2})",
    ))
    .expect("record pattern is a valid regex")
});

/// Phrases the lookup site shows when a domain has no registration
const NOT_FOUND_MARKERS: [&str; 3] = ["没有找到", "未找到", "无记录"];

const NOT_FOUND_MESSAGE: &str = "domain has no ICP registration";
const LAYOUT_CHANGED_MESSAGE: &str = "no registration rows matched; the page layout may have changed";

/// Turns a response body into a check outcome
pub trait ResponseParser: Send + Sync {
    fn parse(&self, body: &str) -> CheckResult;
}

/// Pattern-based parser for the lookup site's results table
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexParser;

impl RegexParser {
    pub fn new() -> Self {
        Self
    }
}

impl ResponseParser for RegexParser {
    fn parse(&self, body: &str) -> CheckResult {
        parse_records(body)
    }
}

/// Parses a lookup page
///
/// Records are returned in document order with every field trimmed.
///
/// # Example
///
/// ```
/// use beian_exporter::lookup::parse_records;
///
/// let result = parse_records("<p>没有找到相关备案信息</p>");
/// assert_eq!(result.status().as_str(), "not_found");
/// ```
pub fn parse_records(body: &str) -> CheckResult {
    let records: Vec<RegistrationRecord> = ROW_PATTERN
        .captures_iter(body)
        .map(|caps| {
            let field = |i: usize| caps.get(i).map_or("", |m| m.as_str().trim());
            RegistrationRecord::new(
                field(1),
                field(2),
                field(3),
                field(4),
                field(5),
                field(6),
                field(7),
            )
        })
        .collect();

    if let Some(result) = CheckResult::success(records) {
        return result;
    }

    if NOT_FOUND_MARKERS.iter().any(|marker| body.contains(marker)) {
        CheckResult::not_found(NOT_FOUND_MESSAGE)
    } else {
        CheckResult::parse_error(LAYOUT_CHANGED_MESSAGE)
    }
}
