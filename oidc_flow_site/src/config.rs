//! Central configuration for the oidc_flow_site crate

use chrono::Duration;
use std::{env, net::SocketAddr, sync::LazyLock};

use crate::error::SiteError;
use crate::reference_data::ReferenceData;

pub(crate) const SESSION_COOKIE_NAME: &str = ".AspNetCore.Cookies";
pub(crate) const IDENTITY_COOKIE_NAME: &str = ".AspNetCore.Identity.Application";
pub(crate) const APPLICATION_COOKIE_NAME: &str =
    "Microsoft.AspNetCore.Applications.Authentication.Cookie";
pub(crate) const CORRELATION_COOKIE_PREFIX: &str = ".AspNetCore.Correlation.OpenIdConnect.";
pub(crate) const NONCE_COOKIE_PREFIX: &str = ".AspNetCore.OpenIdConnect.Nonce.";

/// Value carried by correlation and nonce cookies; the name is what matters
pub(crate) const OIDC_COOKIE_VALUE: &str = "N";

/// Header that picks the user the auto sign-in shortcut logs in
pub(crate) const USER_HINT_HEADER: &str = "X-Identity-Test-User-Hint";

pub(crate) const TENANT: &str = "Identity";
pub(crate) const POLICY: &str = "signinsignup";

pub(crate) const CALLBACK_PATH: &str = "/signin-oidc";
pub(crate) const RESOURCE_PATH: &str = "/Home/About";

pub(crate) static IDP_PREFIX: LazyLock<String> = LazyLock::new(|| format!("/tfp/{TENANT}/{POLICY}"));
pub(crate) static AUTHORIZE_PATH: LazyLock<String> =
    LazyLock::new(|| format!("{}/oauth2/v2.0/authorize", *IDP_PREFIX));
pub(crate) static TOKEN_PATH: LazyLock<String> =
    LazyLock::new(|| format!("{}/oauth2/v2.0/token", *IDP_PREFIX));
pub(crate) static LOGIN_PATH: LazyLock<String> =
    LazyLock::new(|| format!("{}/Account/Login", *IDP_PREFIX));
pub(crate) static DISCOVERY_PATH: LazyLock<String> =
    LazyLock::new(|| format!("{}/.well-known/openid-configuration", *IDP_PREFIX));

pub(crate) static OIDC_COOKIE_LIFETIME: LazyLock<Duration> = LazyLock::new(|| {
    Duration::seconds(
        env::var("OIDC_SITE_OIDC_COOKIE_LIFETIME_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(15 * 60),
    )
});

pub(crate) static CODE_LIFETIME: LazyLock<Duration> = LazyLock::new(|| {
    Duration::seconds(
        env::var("OIDC_SITE_CODE_LIFETIME_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10 * 60),
    )
});

pub(crate) static TOKEN_LIFETIME: LazyLock<Duration> = LazyLock::new(|| {
    Duration::seconds(
        env::var("OIDC_SITE_TOKEN_LIFETIME_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(60 * 60),
    )
});

static SIGNING_SECRET: LazyLock<String> = LazyLock::new(|| {
    env::var("OIDC_SITE_SIGNING_SECRET")
        .unwrap_or_else(|_| "oidc-flow-site-development-signing-secret".to_string())
});

static BIND_ADDR: LazyLock<String> =
    LazyLock::new(|| env::var("OIDC_SITE_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:0".to_string()));

static AUTO_SIGN_IN: LazyLock<bool> = LazyLock::new(|| {
    env::var("OIDC_SITE_AUTO_SIGN_IN")
        .map(|v| !matches!(v.to_lowercase().as_str(), "false" | "0" | "no"))
        .unwrap_or(true)
});

/// OAuth 2.0 `response_type` values the site understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
    Code,
    IdToken,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::IdToken => "id_token",
        }
    }

    pub(crate) fn parse(s: &str) -> Option<Self> {
        match s {
            "code" => Some(Self::Code),
            "id_token" => Some(Self::IdToken),
            _ => None,
        }
    }

    /// Mode used when the request names none
    pub(crate) fn default_mode(&self) -> ResponseMode {
        match self {
            Self::Code => ResponseMode::Query,
            Self::IdToken => ResponseMode::FormPost,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    Query,
    FormPost,
}

impl ResponseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::FormPost => "form_post",
        }
    }

    pub(crate) fn parse(s: &str) -> Option<Self> {
        match s {
            "query" => Some(Self::Query),
            "form_post" => Some(Self::FormPost),
            _ => None,
        }
    }
}

/// A scope exposed by a resource application, requested by name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceScope {
    pub resource: String,
    pub scope: String,
}

/// How the relying party talks to the identity provider
#[derive(Debug, Clone)]
pub struct OidcClientOptions {
    pub client_id: String,
    pub response_type: ResponseType,
    pub response_mode: ResponseMode,
    /// Plain scopes such as `openid` and `profile`
    pub scopes: Vec<String>,
    /// Resource scopes, expanded to full scope values when the challenge is issued
    pub resource_scopes: Vec<ResourceScope>,
}

impl OidcClientOptions {
    /// ID token through `form_post`, requesting `openid profile`
    pub fn new(client_id: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            response_type: ResponseType::IdToken,
            response_mode: ResponseMode::FormPost,
            scopes: vec!["openid".to_string(), "profile".to_string()],
            resource_scopes: Vec::new(),
        }
    }

    /// Authorization code returned on the query string
    pub fn code_flow(mut self) -> Self {
        self.response_type = ResponseType::Code;
        self.response_mode = ResponseMode::Query;
        self
    }

    pub fn with_response_mode(mut self, mode: ResponseMode) -> Self {
        self.response_mode = mode;
        self
    }

    pub fn with_resource_scope(mut self, resource: &str, scope: &str) -> Self {
        self.resource_scopes.push(ResourceScope {
            resource: resource.to_string(),
            scope: scope.to_string(),
        });
        self
    }
}

/// Everything a [`crate::TestSite`] needs, populated in full before start
#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub reference_data: ReferenceData,
    pub oidc_client: OidcClientOptions,
    /// Sign the hinted or default user in on a plain GET of the login page
    pub auto_sign_in: bool,
    /// HMAC key for ID and access tokens
    pub signing_secret: String,
    pub bind_addr: String,
}

impl SiteConfig {
    pub fn new(reference_data: ReferenceData, oidc_client: OidcClientOptions) -> Self {
        Self {
            reference_data,
            oidc_client,
            auto_sign_in: *AUTO_SIGN_IN,
            signing_secret: SIGNING_SECRET.clone(),
            bind_addr: BIND_ADDR.clone(),
        }
    }

    pub fn with_auto_sign_in(mut self, enabled: bool) -> Self {
        self.auto_sign_in = enabled;
        self
    }

    pub(crate) fn validate(&self) -> Result<SocketAddr, SiteError> {
        if self.signing_secret.is_empty() {
            return Err(SiteError::Config("signing secret is empty".to_string()));
        }
        if self
            .reference_data
            .application(&self.oidc_client.client_id)
            .is_none()
        {
            return Err(SiteError::Config(format!(
                "client {} is not a registered application",
                self.oidc_client.client_id
            )));
        }
        self.bind_addr
            .parse()
            .map_err(|e| SiteError::Config(format!("invalid bind address {}: {e}", self.bind_addr)))
    }
}
