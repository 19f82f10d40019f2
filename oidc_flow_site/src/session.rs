//! Extractors for the two sign-in sessions the site keeps: the identity
//! provider login and the relying-party session.

use axum::{
    RequestPartsExt,
    extract::{FromRequestParts, OptionalFromRequestParts},
    response::{IntoResponse, Response},
};
use axum_extra::{TypedHeader, headers};
use http::{HeaderMap, StatusCode, request::Parts};
use std::convert::Infallible;

use crate::config::{IDENTITY_COOKIE_NAME, LOGIN_PATH, SESSION_COOKIE_NAME};
use crate::state::SharedState;
use crate::utils::found;

/// Sends an anonymous visitor to the login page, returning afterwards
pub(crate) struct LoginRedirect {
    return_url: String,
}

impl LoginRedirect {
    pub(crate) fn new(return_url: &str) -> Self {
        Self {
            return_url: return_url.to_string(),
        }
    }

    pub(crate) fn location(&self) -> String {
        format!(
            "{}?returnUrl={}",
            LOGIN_PATH.as_str(),
            urlencoding::encode(&self.return_url)
        )
    }
}

impl IntoResponse for LoginRedirect {
    fn into_response(self) -> Response {
        tracing::debug!("Redirecting to login, returning to {}", self.return_url);
        match found(&self.location(), HeaderMap::new()) {
            Ok(response) => response,
            Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
        }
    }
}

/// User signed in at the identity provider
#[derive(Debug, Clone)]
pub(crate) struct IdentityUser {
    pub(crate) name: String,
}

impl FromRequestParts<SharedState> for IdentityUser {
    type Rejection = LoginRedirect;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let return_url = parts
            .uri
            .path_and_query()
            .map_or("/", |pq| pq.as_str())
            .to_string();
        let redirect = || LoginRedirect::new(&return_url);

        let cookies: TypedHeader<headers::Cookie> =
            parts.extract().await.map_err(|_| redirect())?;
        let session_id = cookies.get(IDENTITY_COOKIE_NAME).ok_or_else(redirect)?;
        let name = state.store.login(session_id).await.ok_or_else(|| {
            tracing::debug!("Unknown identity session");
            redirect()
        })?;

        Ok(Self { name })
    }
}

impl OptionalFromRequestParts<SharedState> for IdentityUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Option<Self>, Self::Rejection> {
        let result = <IdentityUser as FromRequestParts<SharedState>>::from_request_parts(
            parts, state,
        )
        .await;
        Ok(result.ok())
    }
}

/// User signed in at the relying party
#[derive(Debug, Clone)]
pub(crate) struct SiteUser {
    pub(crate) name: String,
    pub(crate) subject: String,
}

impl OptionalFromRequestParts<SharedState> for SiteUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Option<Self>, Self::Rejection> {
        let Ok(cookies) = parts.extract::<TypedHeader<headers::Cookie>>().await else {
            return Ok(None);
        };
        let Some(session_id) = cookies.get(SESSION_COOKIE_NAME) else {
            return Ok(None);
        };

        Ok(state
            .store
            .session(session_id)
            .await
            .map(|session| Self {
                name: session.user,
                subject: session.subject,
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_redirect_location_encodes_return_url() {
        let redirect = LoginRedirect::new("/tfp/Identity/signinsignup/oauth2/v2.0/authorize?a=1&b=2");
        assert_eq!(
            redirect.location(),
            "/tfp/Identity/signinsignup/Account/Login?returnUrl=%2Ftfp%2FIdentity%2Fsigninsignup%2Foauth2%2Fv2.0%2Fauthorize%3Fa%3D1%26b%3D2"
        );
    }

    #[test]
    fn test_login_redirect_response() {
        let response = LoginRedirect::new("/Home/About").into_response();
        assert_eq!(response.status(), StatusCode::FOUND);
    }
}
