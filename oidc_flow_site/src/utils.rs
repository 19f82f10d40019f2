use axum::response::{IntoResponse, Response};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use http::{
    HeaderMap, StatusCode,
    header::{LOCATION, SET_COOKIE},
};
use ring::rand::SecureRandom;
use serde::{Deserialize, Serialize};

use crate::error::SiteError;

/// Expiry that tells a browser to drop a cookie
const EPOCH_EXPIRES: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

pub(crate) fn gen_random_string(len: usize) -> Result<String, SiteError> {
    let rng = ring::rand::SystemRandom::new();
    let mut bytes = vec![0u8; len];
    rng.fill(&mut bytes)
        .map_err(|_| SiteError::Crypto("Failed to generate random string".to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// What the relying party needs back from the identity provider to finish a
/// challenge: which correlation cookie to check and where to return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct StateParams {
    pub(crate) correlation_id: String,
    pub(crate) return_url: String,
}

pub(crate) fn encode_state(state_params: &StateParams) -> Result<String, SiteError> {
    let state_json = serde_json::to_string(state_params)?;
    Ok(URL_SAFE_NO_PAD.encode(state_json))
}

pub(crate) fn decode_state(state: &str) -> Result<StateParams, SiteError> {
    let decoded_bytes = URL_SAFE_NO_PAD
        .decode(state)
        .map_err(|e| SiteError::InvalidState(format!("Failed to decode base64: {e}")))?;
    let decoded_state_string = String::from_utf8(decoded_bytes)
        .map_err(|e| SiteError::InvalidState(format!("Failed to decode UTF-8: {e}")))?;
    serde_json::from_str(&decoded_state_string)
        .map_err(|e| SiteError::InvalidState(format!("Failed to parse state: {e}")))
}

/// `Expires` attribute format, e.g. `Thu, 01 Jan 1970 00:00:00 GMT`
pub(crate) fn format_expires(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Cookie attributes beyond name and value
#[derive(Debug, Clone, Copy)]
pub(crate) struct CookieOptions {
    pub(crate) expires: Option<DateTime<Utc>>,
    pub(crate) same_site: &'static str,
}

impl CookieOptions {
    /// Session cookie sent on top-level navigations
    pub(crate) const SESSION: Self = Self {
        expires: None,
        same_site: "lax",
    };

    /// Cookie that must survive the cross-site `form_post` back to the relying party
    pub(crate) fn cross_site(expires: Option<DateTime<Utc>>) -> Self {
        Self {
            expires,
            same_site: "none",
        }
    }
}

pub(crate) fn header_set_cookie(
    headers: &mut HeaderMap,
    name: &str,
    value: &str,
    options: CookieOptions,
) -> Result<(), SiteError> {
    let expires = options
        .expires
        .map(|at| format!("; expires={}", format_expires(at)))
        .unwrap_or_default();
    let cookie = format!(
        "{name}={value}{expires}; path=/; secure; samesite={}; httponly",
        options.same_site
    );
    tracing::trace!("Set-Cookie: {cookie}");
    headers.append(
        SET_COOKIE,
        cookie
            .parse()
            .map_err(|_| SiteError::Server(format!("Failed to build cookie {name}")))?,
    );
    Ok(())
}

/// Expire a cookie by dating it to the Unix epoch
pub(crate) fn header_delete_cookie(headers: &mut HeaderMap, name: &str) -> Result<(), SiteError> {
    let cookie = format!("{name}=; expires={EPOCH_EXPIRES}; path=/; secure; samesite=none; httponly");
    headers.append(
        SET_COOKIE,
        cookie
            .parse()
            .map_err(|_| SiteError::Server(format!("Failed to build cookie {name}")))?,
    );
    Ok(())
}

/// `302 Found` to `location` carrying `headers`
pub(crate) fn found(location: &str, mut headers: HeaderMap) -> Result<Response, SiteError> {
    headers.insert(
        LOCATION,
        location
            .parse()
            .map_err(|_| SiteError::Server(format!("Invalid redirect location {location}")))?,
    );
    Ok((StatusCode::FOUND, headers).into_response())
}

/// Only site-relative paths are accepted as return targets
pub(crate) fn is_local_url(url: &str) -> bool {
    url.starts_with('/') && !url.starts_with("//") && !url.starts_with("/\\")
}
