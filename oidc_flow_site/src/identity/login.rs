use askama::Template;
use axum::{
    extract::{Form, Query, State},
    response::{Html, IntoResponse, Response},
};
use http::{HeaderMap, StatusCode};
use serde::Deserialize;
use subtle::ConstantTimeEq;

use crate::config::{IDENTITY_COOKIE_NAME, LOGIN_PATH, USER_HINT_HEADER};
use crate::error::{IntoResponseError, SiteError};
use crate::reference_data::TestUser;
use crate::state::{SharedState, SiteState};
use crate::utils::{CookieOptions, found, gen_random_string, header_set_cookie, is_local_url};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct LoginQuery {
    #[serde(rename = "returnUrl")]
    return_url: Option<String>,
}

impl LoginQuery {
    fn target(&self) -> &str {
        match self.return_url.as_deref() {
            Some(url) if is_local_url(url) => url,
            _ => "/",
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct Credentials {
    #[serde(rename = "Username")]
    username: String,
    #[serde(rename = "Password")]
    password: String,
}

#[derive(Template)]
#[template(path = "login.j2")]
struct LoginTemplate<'a> {
    action: String,
    username: &'a str,
    error: Option<&'a str>,
}

impl<'a> LoginTemplate<'a> {
    fn new(return_url: &str, username: &'a str, error: Option<&'a str>) -> Self {
        Self {
            action: format!(
                "{}?returnUrl={}",
                LOGIN_PATH.as_str(),
                urlencoding::encode(return_url)
            ),
            username,
            error,
        }
    }
}

/// GET on the login page. With auto sign-in the hinted (or default) user is
/// signed in straight away, otherwise the credentials form is shown.
pub(crate) async fn login_page(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(query): Query<LoginQuery>,
) -> Result<Response, (StatusCode, String)> {
    if !state.config.auto_sign_in {
        let template = LoginTemplate::new(query.target(), "", None);
        return Ok(Html(template.render().map_err(SiteError::from).into_response_error()?)
            .into_response());
    }

    let user = hinted_user(&state, &headers).await.into_response_error()?;
    sign_in(&state, &user.name, query.target())
        .await
        .into_response_error()
}

/// POST of the credentials form. A failed attempt renders the form again
/// with `200 OK` and never redirects.
pub(crate) async fn login_submit(
    State(state): State<SharedState>,
    Query(query): Query<LoginQuery>,
    Form(credentials): Form<Credentials>,
) -> Result<Response, (StatusCode, String)> {
    let verified = state
        .store
        .user(&credentials.username)
        .await
        .filter(|user| password_matches(user, &credentials.password));

    match verified {
        Some(user) => sign_in(&state, &user.name, query.target())
            .await
            .into_response_error(),
        None => {
            tracing::info!("Rejected sign-in for {}", credentials.username);
            let template = LoginTemplate::new(
                query.target(),
                &credentials.username,
                Some("Invalid username or password."),
            );
            Ok(Html(template.render().map_err(SiteError::from).into_response_error()?)
                .into_response())
        }
    }
}

async fn hinted_user(state: &SiteState, headers: &HeaderMap) -> Result<TestUser, SiteError> {
    let hint = headers
        .get(USER_HINT_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty());

    match hint {
        Some(name) => state
            .store
            .user(name)
            .await
            .ok_or_else(|| SiteError::UnknownUser(name.to_string())),
        None => state
            .store
            .default_user()
            .await
            .ok_or_else(|| SiteError::UnknownUser("no users are registered".to_string())),
    }
}

fn password_matches(user: &TestUser, password: &str) -> bool {
    user.password.as_bytes().ct_eq(password.as_bytes()).into()
}

async fn sign_in(state: &SiteState, user: &str, return_url: &str) -> Result<Response, SiteError> {
    let session_id = gen_random_string(32)?;
    state.store.insert_login(&session_id, user).await;
    tracing::info!("Signed in {user} at the identity provider");

    let mut headers = HeaderMap::new();
    header_set_cookie(
        &mut headers,
        IDENTITY_COOKIE_NAME,
        &session_id,
        CookieOptions::SESSION,
    )?;
    found(return_url, headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OidcClientOptions, SiteConfig};
    use crate::reference_data::ReferenceData;
    use http::header::{LOCATION, SET_COOKIE};

    fn state() -> SiteState {
        let mut data = ReferenceData::new();
        data.create_integrated_web_client_application("web");
        data.create_user("alice", "alice-pw");
        data.create_user("bob", "bob-pw");
        SiteState::new(
            SiteConfig::new(data, OidcClientOptions::new("web")),
            "http://127.0.0.1:5000",
        )
        .expect("client builds")
    }

    fn query(return_url: &str) -> LoginQuery {
        LoginQuery {
            return_url: Some(return_url.to_string()),
        }
    }

    #[test]
    fn test_return_url_must_be_local() {
        assert_eq!(query("/tfp/x?y=1").target(), "/tfp/x?y=1");
        assert_eq!(query("https://evil.example/").target(), "/");
        assert_eq!(query("//evil.example/").target(), "/");
        assert_eq!(LoginQuery::default().target(), "/");
    }

    #[tokio::test]
    async fn test_hinted_user() {
        let state = state();
        let mut headers = HeaderMap::new();
        assert_eq!(
            hinted_user(&state, &headers).await.expect("default").name,
            "alice"
        );

        headers.insert(USER_HINT_HEADER, "bob".parse().expect("valid header"));
        assert_eq!(hinted_user(&state, &headers).await.expect("hinted").name, "bob");

        headers.insert(USER_HINT_HEADER, "mallory".parse().expect("valid header"));
        assert!(matches!(
            hinted_user(&state, &headers).await,
            Err(SiteError::UnknownUser(_))
        ));
    }

    #[test]
    fn test_password_matches() {
        let user = TestUser {
            name: "alice".to_string(),
            password: "alice-pw".to_string(),
        };
        assert!(password_matches(&user, "alice-pw"));
        assert!(!password_matches(&user, "alice-p"));
        assert!(!password_matches(&user, ""));
    }

    #[tokio::test]
    async fn test_sign_in_sets_identity_cookie() {
        let state = state();
        let response = sign_in(&state, "alice", "/back").await.expect("signed in");

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(LOCATION).and_then(|v| v.to_str().ok()),
            Some("/back")
        );
        let cookie = response
            .headers()
            .get(SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .expect("identity cookie");
        let session_id = cookie
            .strip_prefix(".AspNetCore.Identity.Application=")
            .and_then(|rest| rest.split(';').next())
            .expect("cookie value");
        assert_eq!(state.store.login(session_id).await.as_deref(), Some("alice"));
    }

    #[test]
    fn test_login_form_renders_action_and_error() {
        let html = LoginTemplate::new("/a?b=1", "alice", Some("Invalid username or password."))
            .render()
            .expect("renders");

        assert!(html.contains("Account/Login?returnUrl=%2Fa%3Fb%3D1"));
        assert!(html.contains("name=\"Username\""));
        assert!(html.contains("name=\"Password\""));
        assert!(html.contains("Invalid username or password."));
    }
}
