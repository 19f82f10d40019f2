//! oidc_flow_check - hop-by-hop OpenID Connect relying-party flow validator
//!
//! This crate drives an OIDC sign-in flow one HTTP exchange at a time, keeps the
//! cookies the way a browser would, and checks every hop against declarative
//! expectations: status codes, redirect locations, query parameters, HTML forms
//! and the `Set-Cookie` lifecycle of the correlation and nonce cookies.

mod config;
mod cookies;
mod driver;
mod errors;
mod extract;
mod response_assert;
mod scenario;

pub use response_assert::{
    HtmlDocument, assert_has_cookie, assert_has_cookie_named, assert_has_form, assert_html,
    assert_location_has_query_params, assert_ok, assert_parameter_equals, assert_redirect,
};

pub use config::{
    APPLICATION_COOKIE_NAME, CORRELATION_COOKIE_PREFIX, EXPIRY_TOLERANCE_SECS, FlowConfig,
    IDENTITY_COOKIE_NAME, NONCE_COOKIE_PREFIX, SESSION_COOKIE_NAME,
};

pub use cookies::{
    ComparisonCriteria, CookieField, CookieJar, CookieReport, ExpectedCookie, Expiry,
    FieldMismatch, SetCookie, compare,
};

pub use driver::{FlowDriver, FlowStep, USER_HINT_HEADER};
pub use errors::FlowError;
pub use extract::{Form, FormMethod, extract_form, extract_forms, extract_query_params};

pub use scenario::{
    FlowOutcome, FlowPlan, HopSummary, LoginMode, run_authorization_code_flow, run_id_token_flow,
};
