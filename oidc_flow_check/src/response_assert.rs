//! Per-hop assertions. Every failure is tagged with the hop that diverged.

use chrono::Duration;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;
use url::Url;

use crate::config::EXPIRY_TOLERANCE_SECS;
use crate::cookies::{
    ComparisonCriteria, CookieField, CookieReport, ExpectedCookie, FieldMismatch, SetCookie,
    compare_with_tolerance, name_matches,
};
use crate::driver::FlowStep;
use crate::errors::FlowError;
use crate::extract::{Form, extract_form, extract_forms, extract_query_params, is_auto_submitting};

static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<title[^>]*>(.*?)</title\s*>").expect("title pattern is valid")
});

/// An HTML response body together with the hop and URL it came from
#[derive(Debug, Clone)]
pub struct HtmlDocument {
    pub hop: usize,
    pub url: Url,
    pub body: String,
}

impl HtmlDocument {
    pub fn forms(&self) -> Result<Vec<Form>, FlowError> {
        extract_forms(&self.body, &self.url).map_err(|e| e.at_hop(self.hop))
    }

    pub fn title(&self) -> Option<String> {
        TITLE_RE
            .captures(&self.body)
            .map(|caps| caps[1].trim().to_string())
    }

    /// True when the page submits a form without user interaction
    pub fn is_auto_submitting(&self) -> bool {
        is_auto_submitting(&self.body)
    }
}

/// Assert a 3xx response and return its resolved `Location`
pub fn assert_redirect(step: &FlowStep) -> Result<Url, FlowError> {
    if !step.is_redirect() {
        return Err(FlowError::UnexpectedStatus {
            hop: step.hop,
            expected: "redirect (3xx)".to_string(),
            actual: step.status.as_u16(),
        });
    }
    step.location.clone().ok_or_else(|| FlowError::MissingHeader {
        hop: step.hop,
        name: "Location".to_string(),
    })
}

pub fn assert_ok(step: &FlowStep) -> Result<(), FlowError> {
    if step.status.as_u16() != 200 {
        return Err(FlowError::UnexpectedStatus {
            hop: step.hop,
            expected: "200 OK".to_string(),
            actual: step.status.as_u16(),
        });
    }
    Ok(())
}

/// Assert a `text/html` response and wrap its body
pub fn assert_html(step: &FlowStep) -> Result<HtmlDocument, FlowError> {
    let content_type = step.content_type().unwrap_or_default();
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();

    if mime != "text/html" {
        return Err(FlowError::UnexpectedContentType {
            hop: step.hop,
            expected: "text/html".to_string(),
            actual: if content_type.is_empty() {
                "(none)".to_string()
            } else {
                content_type.to_string()
            },
        });
    }

    Ok(HtmlDocument {
        hop: step.hop,
        url: step.url.clone(),
        body: step.body.clone(),
    })
}

/// Assert that `step` set a cookie matching `expected` under `criteria`.
///
/// Candidates are picked by name first (exact or prefix, see
/// [`ComparisonCriteria`]); the first candidate that matches in full is
/// returned. Otherwise the report of the last candidate is raised.
pub fn assert_has_cookie(
    expected: &ExpectedCookie,
    step: &FlowStep,
    criteria: ComparisonCriteria,
) -> Result<SetCookie, FlowError> {
    assert_has_cookie_within(
        expected,
        step,
        criteria,
        Duration::seconds(*EXPIRY_TOLERANCE_SECS),
    )
}

pub(crate) fn assert_has_cookie_within(
    expected: &ExpectedCookie,
    step: &FlowStep,
    criteria: ComparisonCriteria,
    tolerance: Duration,
) -> Result<SetCookie, FlowError> {
    let mut last_report = None;

    for candidate in step
        .set_cookies
        .iter()
        .filter(|c| name_matches(expected, c, criteria))
    {
        let report = compare_with_tolerance(expected, candidate, criteria, tolerance);
        if report.is_match() {
            return Ok(candidate.clone());
        }
        last_report = Some(report);
    }

    let report = last_report.unwrap_or_else(|| CookieReport {
        mismatches: vec![FieldMismatch {
            field: CookieField::Name,
            expected: format!("'{}'", expected.name),
            actual: present_cookies(step),
        }],
    });

    Err(FlowError::CookieMismatch {
        hop: step.hop,
        cookie: expected.name.clone(),
        report,
    })
}

/// Assert that `step` set a cookie called exactly `name`
pub fn assert_has_cookie_named(name: &str, step: &FlowStep) -> Result<SetCookie, FlowError> {
    assert_has_cookie(
        &ExpectedCookie::named(name),
        step,
        ComparisonCriteria::NAME_EQUALS,
    )
}

/// Assert a redirect whose `Location` carries each of `names` exactly once
pub fn assert_location_has_query_params(
    step: &FlowStep,
    names: &[&str],
) -> Result<HashMap<String, String>, FlowError> {
    let location = assert_redirect(step)?;
    extract_query_params(&location, names).map_err(|e| e.at_hop(step.hop))
}

pub fn assert_has_form(document: &HtmlDocument, selector: &str) -> Result<Form, FlowError> {
    extract_form(&document.body, selector, &document.url).map_err(|e| e.at_hop(document.hop))
}

/// Assert that a parameter observed at `step` carries the expected value
pub fn assert_parameter_equals(
    step: &FlowStep,
    name: &str,
    expected: &str,
    actual: &str,
) -> Result<(), FlowError> {
    if expected != actual {
        return Err(FlowError::ParameterMismatch {
            hop: step.hop,
            name: name.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        });
    }
    Ok(())
}

fn present_cookies(step: &FlowStep) -> String {
    if step.set_cookies.is_empty() {
        return "no Set-Cookie".to_string();
    }
    step.set_cookies
        .iter()
        .map(|c| format!("'{}'", c.name))
        .collect::<Vec<_>>()
        .join(", ")
}
