use chrono::{DateTime, Duration, Utc};
use std::fmt;

use crate::config::EXPIRY_TOLERANCE_SECS;

use super::criteria::ComparisonCriteria;
use super::types::{ExpectedCookie, Expiry, SetCookie};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookieField {
    Name,
    Value,
    Path,
    Domain,
    Secure,
    HttpOnly,
    Expires,
}

impl fmt::Display for CookieField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Name => "name",
            Self::Value => "value",
            Self::Path => "path",
            Self::Domain => "domain",
            Self::Secure => "secure",
            Self::HttpOnly => "httponly",
            Self::Expires => "expires",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMismatch {
    pub field: CookieField,
    pub expected: String,
    pub actual: String,
}

/// Every field that differed between an expected and an actual cookie
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieReport {
    pub mismatches: Vec<FieldMismatch>,
}

impl CookieReport {
    pub fn is_match(&self) -> bool {
        self.mismatches.is_empty()
    }

    pub fn field(&self, field: CookieField) -> Option<&FieldMismatch> {
        self.mismatches.iter().find(|m| m.field == field)
    }

    fn push(&mut self, field: CookieField, expected: impl ToString, actual: impl ToString) {
        self.mismatches.push(FieldMismatch {
            field,
            expected: expected.to_string(),
            actual: actual.to_string(),
        });
    }
}

impl fmt::Display for CookieReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.mismatches.is_empty() {
            return f.write_str("match");
        }
        for (i, m) in self.mismatches.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: expected {}, got {}", m.field, m.expected, m.actual)?;
        }
        Ok(())
    }
}

/// Compare with the configured expiry tolerance
pub fn compare(
    expected: &ExpectedCookie,
    actual: &SetCookie,
    criteria: ComparisonCriteria,
) -> CookieReport {
    compare_with_tolerance(
        expected,
        actual,
        criteria,
        Duration::seconds(*EXPIRY_TOLERANCE_SECS),
    )
}

pub(crate) fn compare_with_tolerance(
    expected: &ExpectedCookie,
    actual: &SetCookie,
    criteria: ComparisonCriteria,
    tolerance: Duration,
) -> CookieReport {
    let mut report = CookieReport::default();

    if criteria.name_equals && actual.name != expected.name {
        report.push(
            CookieField::Name,
            quoted(&expected.name),
            quoted(&actual.name),
        );
    }
    if criteria.name_starts_with && !actual.name.starts_with(&expected.name) {
        report.push(
            CookieField::Name,
            format!("prefix {}", quoted(&expected.name)),
            quoted(&actual.name),
        );
    }
    if criteria.value && actual.value != expected.value {
        report.push(
            CookieField::Value,
            quoted(&expected.value),
            quoted(&actual.value),
        );
    }
    if criteria.path && actual.path != expected.path {
        report.push(
            CookieField::Path,
            optional(&expected.path),
            optional(&actual.path),
        );
    }
    if criteria.domain && actual.domain != expected.domain {
        report.push(
            CookieField::Domain,
            optional(&expected.domain),
            optional(&actual.domain),
        );
    }
    if criteria.secure && actual.secure != expected.secure {
        report.push(CookieField::Secure, expected.secure, actual.secure);
    }
    if criteria.http_only && actual.http_only != expected.http_only {
        report.push(CookieField::HttpOnly, expected.http_only, actual.http_only);
    }
    if criteria.expires {
        check_expiry(&mut report, expected.expiry, actual, tolerance);
    }
    let deletion_checked = criteria.expires && expected.expiry == Expiry::Delete;
    if criteria.delete && !deletion_checked && !actual.is_epoch_expiry() {
        report.push(
            CookieField::Expires,
            "deletion (Unix epoch)",
            instant(actual.expires),
        );
    }

    report
}

fn check_expiry(
    report: &mut CookieReport,
    expected: Expiry,
    actual: &SetCookie,
    tolerance: Duration,
) {
    match expected {
        Expiry::Session => {
            if actual.expires.is_some() || actual.max_age.is_some() {
                report.push(
                    CookieField::Expires,
                    "session cookie",
                    instant(actual.expiry_instant()),
                );
            }
        }
        Expiry::At(at) => {
            let within = actual
                .expiry_instant()
                .is_some_and(|t| (t - at).abs() <= tolerance);
            if !within {
                report.push(
                    CookieField::Expires,
                    format!("{} (±{}s)", instant(Some(at)), tolerance.num_seconds()),
                    instant(actual.expiry_instant()),
                );
            }
        }
        Expiry::Delete => {
            if !actual.is_epoch_expiry() {
                report.push(
                    CookieField::Expires,
                    "deletion (Unix epoch)",
                    instant(actual.expires),
                );
            }
        }
    }
}

/// Candidate selection used before a full comparison. Without any name check
/// enabled the expected name is treated as a prefix.
pub(crate) fn name_matches(
    expected: &ExpectedCookie,
    actual: &SetCookie,
    criteria: ComparisonCriteria,
) -> bool {
    if criteria.name_equals {
        actual.name == expected.name
    } else {
        actual.name.starts_with(&expected.name)
    }
}

fn quoted(s: &str) -> String {
    format!("'{s}'")
}

fn optional(s: &Option<String>) -> String {
    s.as_deref().map_or_else(|| "(none)".to_string(), quoted)
}

fn instant(t: Option<DateTime<Utc>>) -> String {
    t.map_or_else(|| "(none)".to_string(), |t| t.to_rfc2822())
}
