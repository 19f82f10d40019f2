//! Central configuration for the oidc_flow_check crate

use chrono::Duration;
use std::{env, sync::LazyLock};

/// Relying-party session cookie stamped by the callback
pub static SESSION_COOKIE_NAME: LazyLock<String> = LazyLock::new(|| {
    env::var("OIDC_FLOW_SESSION_COOKIE_NAME").unwrap_or_else(|_| ".AspNetCore.Cookies".to_string())
});

/// Identity provider login cookie stamped by the login page
pub static IDENTITY_COOKIE_NAME: LazyLock<String> = LazyLock::new(|| {
    env::var("OIDC_FLOW_IDENTITY_COOKIE_NAME")
        .unwrap_or_else(|_| ".AspNetCore.Identity.Application".to_string())
});

/// Identity provider application session cookie stamped by the authorize endpoint
pub static APPLICATION_COOKIE_NAME: LazyLock<String> = LazyLock::new(|| {
    env::var("OIDC_FLOW_APPLICATION_COOKIE_NAME")
        .unwrap_or_else(|_| "Microsoft.AspNetCore.Applications.Authentication.Cookie".to_string())
});

/// Correlation cookies are named with this prefix followed by a per-request id
pub static CORRELATION_COOKIE_PREFIX: LazyLock<String> = LazyLock::new(|| {
    env::var("OIDC_FLOW_CORRELATION_COOKIE_PREFIX")
        .unwrap_or_else(|_| ".AspNetCore.Correlation.OpenIdConnect.".to_string())
});

/// Nonce cookies are named with this prefix followed by the nonce
pub static NONCE_COOKIE_PREFIX: LazyLock<String> = LazyLock::new(|| {
    env::var("OIDC_FLOW_NONCE_COOKIE_PREFIX")
        .unwrap_or_else(|_| ".AspNetCore.OpenIdConnect.Nonce.".to_string())
});

/// Accepted distance between an expected and an actual cookie expiry
pub static EXPIRY_TOLERANCE_SECS: LazyLock<i64> =
    LazyLock::new(|| env_secs("OIDC_FLOW_EXPIRY_TOLERANCE_SECS", 60));

// Correlation and nonce cookies live 15 minutes
static OIDC_COOKIE_LIFETIME_SECS: LazyLock<i64> =
    LazyLock::new(|| env_secs("OIDC_FLOW_OIDC_COOKIE_LIFETIME_SECS", 15 * 60));

/// Number of seconds held by `name`, or `default` when unset or unparsable
pub(crate) fn env_secs(name: &str, default: i64) -> i64 {
    env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

static TARGET_ORIGIN: LazyLock<String> = LazyLock::new(|| {
    env::var("OIDC_FLOW_TARGET_ORIGIN").unwrap_or_else(|_| "https://localhost".to_string())
});

pub(crate) static RESOURCE_PATH: LazyLock<String> = LazyLock::new(|| {
    env::var("OIDC_FLOW_RESOURCE_PATH").unwrap_or_else(|_| "/Home/About".to_string())
});

static USER_HINT: LazyLock<Option<String>> =
    LazyLock::new(|| env::var("OIDC_FLOW_USER_HINT").ok().filter(|s| !s.is_empty()));

/// Everything a scenario needs to know about the site under test.
///
/// Populated in full before a driver is constructed; nothing reads the
/// environment once a flow has started.
#[derive(Debug, Clone)]
pub struct FlowConfig {
    /// Origin the driver resolves relative URLs against
    pub origin: String,
    pub session_cookie_name: String,
    pub identity_cookie_name: String,
    pub application_cookie_name: String,
    pub correlation_cookie_prefix: String,
    pub nonce_cookie_prefix: String,
    /// Lifetime the site gives correlation and nonce cookies
    pub oidc_cookie_lifetime: Duration,
    pub expiry_tolerance: Duration,
    /// Sent as `X-Identity-Test-User-Hint` on every hop when set
    pub user_hint: Option<String>,
}

impl FlowConfig {
    /// Build a configuration from `OIDC_FLOW_*` environment variables and defaults
    pub fn from_env() -> Self {
        Self {
            origin: TARGET_ORIGIN.clone(),
            session_cookie_name: SESSION_COOKIE_NAME.clone(),
            identity_cookie_name: IDENTITY_COOKIE_NAME.clone(),
            application_cookie_name: APPLICATION_COOKIE_NAME.clone(),
            correlation_cookie_prefix: CORRELATION_COOKIE_PREFIX.clone(),
            nonce_cookie_prefix: NONCE_COOKIE_PREFIX.clone(),
            oidc_cookie_lifetime: Duration::seconds(*OIDC_COOKIE_LIFETIME_SECS),
            expiry_tolerance: Duration::seconds(*EXPIRY_TOLERANCE_SECS),
            user_hint: USER_HINT.clone(),
        }
    }

    /// Same as [`FlowConfig::from_env`] with the origin replaced
    pub fn for_origin(origin: &str) -> Self {
        Self {
            origin: origin.trim_end_matches('/').to_string(),
            ..Self::from_env()
        }
    }

    pub fn with_user_hint(mut self, user: &str) -> Self {
        self.user_hint = Some(user.to_string());
        self
    }
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
