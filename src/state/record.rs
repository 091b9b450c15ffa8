use serde::Serialize;
use std::fmt;

/// One registration entry returned by the lookup site for a domain
///
/// All fields are kept exactly as the site renders them (after trimming);
/// no semantic validation is performed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationRecord {
    serial_number: String,
    operator_name: String,
    operator_type: String,
    registration_number: String,
    site_name: String,
    site_url: String,
    approval_date: String,
}

impl RegistrationRecord {
    pub fn new(
        serial_number: impl Into<String>,
        operator_name: impl Into<String>,
        operator_type: impl Into<String>,
        registration_number: impl Into<String>,
        site_name: impl Into<String>,
        site_url: impl Into<String>,
        approval_date: impl Into<String>,
    ) -> Self {
        Self {
            serial_number: serial_number.into(),
            operator_name: operator_name.into(),
            operator_type: operator_type.into(),
            registration_number: registration_number.into(),
            site_name: site_name.into(),
            site_url: site_url.into(),
            approval_date: approval_date.into(),
        }
    }

    pub fn serial_number(&self) -> &str {
        &self.serial_number
    }

    pub fn operator_name(&self) -> &str {
        &self.operator_name
    }

    pub fn operator_type(&self) -> &str {
        &self.operator_type
    }

    pub fn registration_number(&self) -> &str {
        &self.registration_number
    }

    pub fn site_name(&self) -> &str {
        &self.site_name
    }

    pub fn site_url(&self) -> &str {
        &self.site_url
    }

    pub fn approval_date(&self) -> &str {
        &self.approval_date
    }
}

/// A non-empty, ordered list of registration records
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Records(Vec<RegistrationRecord>);

impl Records {
    /// Wraps `records`, or returns `None` if the list is empty
    pub fn new(records: Vec<RegistrationRecord>) -> Option<Self> {
        if records.is_empty() {
            None
        } else {
            Some(Self(records))
        }
    }

    /// The first record in document order
    pub fn first(&self) -> &RegistrationRecord {
        &self.0[0]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; present for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RegistrationRecord> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[RegistrationRecord] {
        &self.0
    }
}

impl<'a> IntoIterator for &'a Records {
    type Item = &'a RegistrationRecord;
    type IntoIter = std::slice::Iter<'a, RegistrationRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Outcome of checking one domain at one point in time
///
/// # Classification
///
/// | Variant          | Meaning                                   | Retried |
/// |------------------|-------------------------------------------|---------|
/// | `Success`        | At least one registration record matched  | No      |
/// | `NotFound`       | The site answered "no record"             | No      |
/// | `ParseError`     | Page structure did not match the pattern  | No      |
/// | `TransportError` | Timeout, connection failure, non-2xx      | Yes     |
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckResult {
    Success { records: Records },
    NotFound { message: String },
    ParseError { message: String },
    #[serde(rename = "error")]
    TransportError { message: String },
}

impl CheckResult {
    /// Builds a `Success`, or `None` when no records were matched
    pub fn success(records: Vec<RegistrationRecord>) -> Option<Self> {
        Records::new(records).map(|records| CheckResult::Success { records })
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        CheckResult::NotFound {
            message: message.into(),
        }
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        CheckResult::ParseError {
            message: message.into(),
        }
    }

    pub fn transport_error(message: impl Into<String>) -> Self {
        CheckResult::TransportError {
            message: message.into(),
        }
    }

    pub fn status(&self) -> CheckStatus {
        match self {
            CheckResult::Success { .. } => CheckStatus::Success,
            CheckResult::NotFound { .. } => CheckStatus::NotFound,
            CheckResult::ParseError { .. } => CheckStatus::ParseError,
            CheckResult::TransportError { .. } => CheckStatus::Error,
        }
    }

    /// Whether this outcome is a failure to communicate and worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(self, CheckResult::TransportError { .. })
    }

    /// Whether this outcome is a definitive answer from the lookup site
    pub fn is_terminal(&self) -> bool {
        !self.is_retryable()
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CheckResult::Success { .. })
    }

    /// The matched records, if this is a `Success`
    pub fn records(&self) -> Option<&Records> {
        match self {
            CheckResult::Success { records } => Some(records),
            _ => None,
        }
    }

    /// The explanatory message for non-success outcomes
    pub fn message(&self) -> Option<&str> {
        match self {
            CheckResult::Success { .. } => None,
            CheckResult::NotFound { message }
            | CheckResult::ParseError { message }
            | CheckResult::TransportError { message } => Some(message),
        }
    }
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckResult::Success { records } => {
                write!(f, "success ({} record(s))", records.len())
            }
            other => write!(
                f,
                "{}: {}",
                other.status(),
                other.message().unwrap_or_default()
            ),
        }
    }
}

/// Coarse classification of a [`CheckResult`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Success,
    NotFound,
    ParseError,
    Error,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Success => "success",
            CheckStatus::NotFound => "not_found",
            CheckStatus::ParseError => "parse_error",
            CheckStatus::Error => "error",
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
