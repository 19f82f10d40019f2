//! The relying-party half of the site: a home page, a protected resource and
//! the OpenID Connect callback.

use askama::Template;
use axum::{
    extract::{Form, Query, State},
    response::{Html, IntoResponse, Response},
};
use axum_extra::{TypedHeader, headers};
use chrono::Utc;
use http::{HeaderMap, StatusCode, Uri};
use serde::Deserialize;

use crate::config::{
    AUTHORIZE_PATH, CORRELATION_COOKIE_PREFIX, NONCE_COOKIE_PREFIX, OIDC_COOKIE_LIFETIME,
    OIDC_COOKIE_VALUE, ResponseType, SESSION_COOKIE_NAME, TOKEN_PATH,
};
use crate::error::{IntoResponseError, SiteError};
use crate::idtoken::verify_id_token;
use crate::reference_data::scope_value;
use crate::session::SiteUser;
use crate::state::{SharedState, SiteState};
use crate::storage::RelyingPartySession;
use crate::utils::{
    CookieOptions, StateParams, decode_state, encode_state, found, gen_random_string,
    header_delete_cookie, header_set_cookie, is_local_url,
};

#[derive(Template)]
#[template(path = "home.j2")]
struct HomeTemplate {
    user: Option<String>,
}

#[derive(Template)]
#[template(path = "about.j2")]
struct AboutTemplate {
    user: String,
    subject: String,
}

/// Parameters the identity provider sends back to the callback
#[derive(Debug, Default, Deserialize)]
pub(crate) struct AuthResponse {
    code: Option<String>,
    id_token: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    id_token: Option<String>,
}

pub(crate) async fn home(user: Option<SiteUser>) -> Result<Html<String>, (StatusCode, String)> {
    let template = HomeTemplate {
        user: user.map(|u| u.name),
    };
    let html = Html(
        template
            .render()
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?,
    );
    Ok(html)
}

/// Protected resource: signed-in users get the page, everyone else is
/// challenged.
pub(crate) async fn about(
    State(state): State<SharedState>,
    user: Option<SiteUser>,
    uri: Uri,
) -> Result<Response, (StatusCode, String)> {
    match user {
        Some(user) => {
            let template = AboutTemplate {
                user: user.name,
                subject: user.subject,
            };
            let html = Html(
                template
                    .render()
                    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?,
            );
            Ok(html.into_response())
        }
        None => {
            let return_url = uri.path_and_query().map_or("/", |pq| pq.as_str());
            challenge(&state, return_url).into_response_error()
        }
    }
}

/// Set the correlation and nonce cookies and send the browser to authorize
fn challenge(state: &SiteState, return_url: &str) -> Result<Response, SiteError> {
    let options = &state.config.oidc_client;
    let correlation_id = gen_random_string(32)?;
    let nonce = gen_random_string(32)?;

    let encoded_state = encode_state(&StateParams {
        correlation_id: correlation_id.clone(),
        return_url: return_url.to_string(),
    })?;

    let scope = options
        .scopes
        .iter()
        .cloned()
        .chain(
            options
                .resource_scopes
                .iter()
                .map(|rs| scope_value(&state.origin, &rs.resource, &rs.scope)),
        )
        .collect::<Vec<_>>()
        .join(" ");

    let auth_url = format!(
        "{}?client_id={}&redirect_uri={}&response_type={}&response_mode={}&scope={}&state={}&nonce={}",
        state.url(&AUTHORIZE_PATH),
        urlencoding::encode(&options.client_id),
        urlencoding::encode(&state.callback_uri()),
        options.response_type.as_str(),
        options.response_mode.as_str(),
        urlencoding::encode(&scope),
        encoded_state,
        nonce,
    );
    tracing::debug!("Challenging for {return_url}, auth URL: {auth_url}");

    let expires = Utc::now() + *OIDC_COOKIE_LIFETIME;
    let mut headers = HeaderMap::new();
    header_set_cookie(
        &mut headers,
        &format!("{NONCE_COOKIE_PREFIX}{nonce}"),
        OIDC_COOKIE_VALUE,
        CookieOptions::cross_site(Some(expires)),
    )?;
    header_set_cookie(
        &mut headers,
        &format!("{CORRELATION_COOKIE_PREFIX}{correlation_id}"),
        OIDC_COOKIE_VALUE,
        CookieOptions::cross_site(Some(expires)),
    )?;

    found(&auth_url, headers)
}

pub(crate) async fn signin_get(
    State(state): State<SharedState>,
    cookies: Option<TypedHeader<headers::Cookie>>,
    Query(response): Query<AuthResponse>,
) -> Result<Response, (StatusCode, String)> {
    complete_sign_in(&state, cookies.as_deref(), response)
        .await
        .into_response_error()
}

/// Handler for callbacks using the `form_post` response mode
pub(crate) async fn signin_post(
    State(state): State<SharedState>,
    cookies: Option<TypedHeader<headers::Cookie>>,
    Form(response): Form<AuthResponse>,
) -> Result<Response, (StatusCode, String)> {
    complete_sign_in(&state, cookies.as_deref(), response)
        .await
        .into_response_error()
}

async fn complete_sign_in(
    state: &SiteState,
    cookies: Option<&headers::Cookie>,
    response: AuthResponse,
) -> Result<Response, SiteError> {
    if let Some(error) = response.error {
        let description = response.error_description.unwrap_or_default();
        return Err(SiteError::RemoteFailure(format!("{error} {description}")));
    }

    let encoded_state = response
        .state
        .filter(|s| !s.is_empty())
        .ok_or_else(|| SiteError::InvalidState("state is missing".to_string()))?;
    let state_params = decode_state(&encoded_state)?;

    let correlation_cookie = format!("{CORRELATION_COOKIE_PREFIX}{}", state_params.correlation_id);
    let correlated = cookies
        .and_then(|c| c.get(&correlation_cookie))
        .is_some_and(|v| v == OIDC_COOKIE_VALUE);
    if !correlated {
        tracing::warn!("Correlation cookie {correlation_cookie} not found");
        return Err(SiteError::CorrelationFailed);
    }

    let options = &state.config.oidc_client;
    let id_token = match (response.code, response.id_token) {
        (Some(code), _) if options.response_type == ResponseType::Code => {
            exchange_code_for_token(state, &code).await?
        }
        (_, Some(id_token)) if options.response_type == ResponseType::IdToken => id_token,
        _ => {
            return Err(SiteError::InvalidRequest(format!(
                "callback carries no {}",
                options.response_type.as_str()
            )));
        }
    };

    let claims = verify_id_token(
        &id_token,
        &state.issuer(),
        &options.client_id,
        &state.config.signing_secret,
    )?;

    let nonce_cookie = claims
        .nonce
        .as_deref()
        .map(|nonce| format!("{NONCE_COOKIE_PREFIX}{nonce}"))
        .ok_or(SiteError::NonceMismatch)?;
    if cookies.and_then(|c| c.get(&nonce_cookie)).is_none() {
        tracing::warn!("Nonce cookie {nonce_cookie} not found");
        return Err(SiteError::NonceMismatch);
    }

    let return_url = if is_local_url(&state_params.return_url) {
        state_params.return_url
    } else {
        "/".to_string()
    };

    let session_id = gen_random_string(32)?;
    state
        .store
        .insert_session(
            &session_id,
            RelyingPartySession {
                user: claims.name.clone(),
                subject: claims.sub,
            },
        )
        .await;
    tracing::info!("Signed {} in to the relying party", claims.name);

    let mut headers = HeaderMap::new();
    header_set_cookie(
        &mut headers,
        SESSION_COOKIE_NAME,
        &session_id,
        CookieOptions::SESSION,
    )?;
    header_delete_cookie(&mut headers, &correlation_cookie)?;
    header_delete_cookie(&mut headers, &nonce_cookie)?;

    found(&return_url, headers)
}

/// Redeem an authorization code at the site's own token endpoint
async fn exchange_code_for_token(state: &SiteState, code: &str) -> Result<String, SiteError> {
    let options = &state.config.oidc_client;
    let response = state
        .client
        .post(state.url(&TOKEN_PATH))
        .form(&[
            ("grant_type", "authorization_code".to_string()),
            ("code", code.to_string()),
            ("client_id", options.client_id.clone()),
            ("redirect_uri", state.callback_uri()),
        ])
        .send()
        .await
        .map_err(|e| SiteError::TokenExchange(e.to_string()))?;

    let status = response.status();
    if status != reqwest::StatusCode::OK {
        tracing::debug!("Token Exchange Response: {:#?}", response);
        return Err(SiteError::TokenExchange(status.to_string()));
    }

    let response_json: TokenResponse = response
        .json()
        .await
        .map_err(|e| SiteError::TokenExchange(e.to_string()))?;

    response_json
        .id_token
        .ok_or_else(|| SiteError::TokenExchange("ID token not present in response".to_string()))
}
