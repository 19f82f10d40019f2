use askama::Template;
use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Response},
};
use axum_extra::{TypedHeader, headers};
use chrono::Utc;
use http::{HeaderMap, StatusCode, Uri};
use serde::Deserialize;

use super::STANDARD_SCOPES;
use crate::config::{APPLICATION_COOKIE_NAME, ResponseMode, ResponseType};
use crate::error::{IntoResponseError, SiteError};
use crate::idtoken::issue_id_token;
use crate::session::{IdentityUser, LoginRedirect};
use crate::state::{SharedState, SiteState};
use crate::storage::{ApplicationSession, AuthorizationCode};
use crate::utils::{CookieOptions, found, gen_random_string, header_set_cookie};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AuthorizeRequest {
    client_id: Option<String>,
    redirect_uri: Option<String>,
    response_type: Option<String>,
    response_mode: Option<String>,
    scope: Option<String>,
    state: Option<String>,
    nonce: Option<String>,
}

struct FormField {
    name: &'static str,
    value: String,
}

#[derive(Template)]
#[template(path = "form_post.j2")]
struct FormPostTemplate {
    action: String,
    fields: Vec<FormField>,
}

/// A request that passed client, redirect URI and response type checks
struct ValidatedRequest {
    client_id: String,
    redirect_uri: String,
    response_type: ResponseType,
    response_mode: ResponseMode,
    scopes: Vec<String>,
    state: Option<String>,
    nonce: Option<String>,
}

pub(crate) async fn authorize(
    State(state): State<SharedState>,
    user: Option<IdentityUser>,
    cookies: Option<TypedHeader<headers::Cookie>>,
    uri: Uri,
    Query(request): Query<AuthorizeRequest>,
) -> Result<Response, (StatusCode, String)> {
    let request = validate(&state, request).await.into_response_error()?;

    if let Some(unknown) = unknown_scope(&state, &request.scopes).await {
        tracing::info!("Rejecting unknown scope {unknown}");
        return error_redirect(&request, "invalid_scope", &format!("unknown scope {unknown}"))
            .into_response_error();
    }

    let Some(user) = user else {
        let return_url = uri.path_and_query().map_or("/", |pq| pq.as_str());
        return Ok(LoginRedirect::new(return_url).into_response());
    };

    issue(&state, &request, &user.name, cookies.as_deref())
        .await
        .into_response_error()
}

async fn validate(
    state: &SiteState,
    request: AuthorizeRequest,
) -> Result<ValidatedRequest, SiteError> {
    let client_id = required(request.client_id, "client_id")?;
    let app = state
        .store
        .application(&client_id)
        .await
        .ok_or_else(|| SiteError::UnknownClient(client_id.clone()))?;

    let redirect_uri = required(request.redirect_uri, "redirect_uri")?;
    if !app.redirect_uris.contains(&redirect_uri) {
        return Err(SiteError::InvalidRedirectUri(redirect_uri));
    }

    let response_type = required(request.response_type, "response_type")?;
    let response_type = ResponseType::parse(&response_type)
        .ok_or(SiteError::UnsupportedResponseType(response_type))?;

    let response_mode = match request.response_mode.filter(|m| !m.is_empty()) {
        None => response_type.default_mode(),
        Some(mode) => {
            ResponseMode::parse(&mode).ok_or(SiteError::UnsupportedResponseMode(mode))?
        }
    };
    // Tokens never travel on the query string
    if response_type == ResponseType::IdToken && response_mode == ResponseMode::Query {
        return Err(SiteError::UnsupportedResponseMode(
            "query is not allowed for id_token".to_string(),
        ));
    }

    let nonce = request.nonce.filter(|n| !n.is_empty());
    if response_type == ResponseType::IdToken && nonce.is_none() {
        return Err(SiteError::InvalidRequest("nonce is required".to_string()));
    }

    Ok(ValidatedRequest {
        client_id,
        redirect_uri,
        response_type,
        response_mode,
        scopes: request
            .scope
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_string)
            .collect(),
        state: request.state.filter(|s| !s.is_empty()),
        nonce,
    })
}

fn required(value: Option<String>, name: &str) -> Result<String, SiteError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| SiteError::InvalidRequest(format!("{name} is required")))
}

async fn unknown_scope(state: &SiteState, scopes: &[String]) -> Option<String> {
    for scope in scopes {
        if STANDARD_SCOPES.contains(&scope.as_str()) {
            continue;
        }
        if state.store.scope(scope).await.is_none() {
            return Some(scope.clone());
        }
    }
    None
}

/// Report an OAuth error back to the client's redirect URI
fn error_redirect(
    request: &ValidatedRequest,
    error: &str,
    description: &str,
) -> Result<Response, SiteError> {
    let mut location = url::Url::parse(&request.redirect_uri)
        .map_err(|e| SiteError::InvalidRedirectUri(format!("{}: {e}", request.redirect_uri)))?;
    {
        let mut query = location.query_pairs_mut();
        query.append_pair("error", error);
        query.append_pair("error_description", description);
        if let Some(state) = &request.state {
            query.append_pair("state", state);
        }
    }
    found(location.as_str(), HeaderMap::new())
}

/// Stamp the application session and hand the result back to the client
async fn issue(
    state: &SiteState,
    request: &ValidatedRequest,
    user: &str,
    cookies: Option<&headers::Cookie>,
) -> Result<Response, SiteError> {
    let existing = match cookies.and_then(|c| c.get(APPLICATION_COOKIE_NAME)) {
        Some(id) => state
            .store
            .application_session(id)
            .await
            .filter(|s| s.client_id == request.client_id && s.user == user)
            .map(|_| id.to_string()),
        None => None,
    };
    let session_id = match existing {
        Some(id) => id,
        None => {
            let id = gen_random_string(32)?;
            state
                .store
                .insert_application_session(
                    &id,
                    ApplicationSession {
                        client_id: request.client_id.clone(),
                        user: user.to_string(),
                    },
                )
                .await;
            id
        }
    };

    let mut headers = HeaderMap::new();
    header_set_cookie(
        &mut headers,
        APPLICATION_COOKIE_NAME,
        &session_id,
        CookieOptions::cross_site(None),
    )?;

    let mut fields = Vec::new();
    match request.response_type {
        ResponseType::Code => {
            let code = gen_random_string(32)?;
            state
                .store
                .insert_code(
                    &code,
                    AuthorizationCode {
                        client_id: request.client_id.clone(),
                        redirect_uri: request.redirect_uri.clone(),
                        user: user.to_string(),
                        nonce: request.nonce.clone(),
                        scopes: request.scopes.clone(),
                        issued_at: Utc::now(),
                    },
                )
                .await;
            fields.push(FormField {
                name: "code",
                value: code,
            });
        }
        ResponseType::IdToken => {
            let id_token = issue_id_token(
                &state.issuer(),
                &request.client_id,
                user,
                request.nonce.as_deref(),
                &state.config.signing_secret,
            )?;
            fields.push(FormField {
                name: "id_token",
                value: id_token,
            });
        }
    }
    if let Some(s) = &request.state {
        fields.push(FormField {
            name: "state",
            value: s.clone(),
        });
    }
    tracing::info!(
        "Authorized {user} for {} ({})",
        request.client_id,
        request.response_type.as_str()
    );

    match request.response_mode {
        ResponseMode::Query => {
            let mut location = url::Url::parse(&request.redirect_uri).map_err(|e| {
                SiteError::InvalidRedirectUri(format!("{}: {e}", request.redirect_uri))
            })?;
            location
                .query_pairs_mut()
                .extend_pairs(fields.iter().map(|f| (f.name, f.value.as_str())));
            found(location.as_str(), headers)
        }
        ResponseMode::FormPost => {
            let template = FormPostTemplate {
                action: request.redirect_uri.clone(),
                fields,
            };
            Ok((headers, Html(template.render()?)).into_response())
        }
    }
}
