//! Management pages for registered client applications. Signed-in users can
//! list an application's redirect URIs and remove them.

use askama::Template;
use axum::{
    extract::{Form, Path, Query, State},
    response::{Html, Response},
};
use http::{HeaderMap, StatusCode};
use serde::Deserialize;

use crate::error::{IntoResponseError, SiteError};
use crate::session::IdentityUser;
use crate::state::SharedState;
use crate::utils::found;

pub(crate) const APPLICATIONS_PATH: &str = "/Identity/Applications";

struct RedirectUriRow {
    uri: String,
    remove_url: String,
}

#[derive(Template)]
#[template(path = "application.j2")]
struct ApplicationTemplate {
    user: String,
    client_id: String,
    name: String,
    redirect_uris: Vec<RedirectUriRow>,
}

/// Confirmation page for removing one redirect URI
#[derive(Template)]
#[template(path = "remove_redirect_uri.j2")]
struct RemoveRedirectUriViewModel {
    name: String,
    redirect_uri: String,
    action: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RedirectUriQuery {
    #[serde(rename = "redirectUri")]
    redirect_uri: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RemoveRedirectUriForm {
    #[serde(rename = "RedirectUri")]
    redirect_uri: String,
}

fn application_path(client_id: &str) -> String {
    format!("{APPLICATIONS_PATH}/{}", urlencoding::encode(client_id))
}

fn remove_path(client_id: &str) -> String {
    format!("{}/RedirectUris/Remove", application_path(client_id))
}

pub(crate) async fn application(
    State(state): State<SharedState>,
    user: IdentityUser,
    Path(client_id): Path<String>,
) -> Result<Html<String>, (StatusCode, String)> {
    let app = state
        .store
        .application(&client_id)
        .await
        .ok_or_else(|| SiteError::NotFound(format!("application {client_id}")))
        .into_response_error()?;

    let template = ApplicationTemplate {
        user: user.name,
        redirect_uris: app
            .redirect_uris
            .iter()
            .map(|uri| RedirectUriRow {
                uri: uri.clone(),
                remove_url: format!(
                    "{}?redirectUri={}",
                    remove_path(&app.client_id),
                    urlencoding::encode(uri)
                ),
            })
            .collect(),
        client_id: app.client_id,
        name: app.name,
    };
    template
        .render()
        .map(Html)
        .map_err(SiteError::from)
        .into_response_error()
}

pub(crate) async fn remove_redirect_uri_page(
    State(state): State<SharedState>,
    _user: IdentityUser,
    Path(client_id): Path<String>,
    Query(query): Query<RedirectUriQuery>,
) -> Result<Html<String>, (StatusCode, String)> {
    let app = state
        .store
        .application(&client_id)
        .await
        .ok_or_else(|| SiteError::NotFound(format!("application {client_id}")))
        .into_response_error()?;
    if !app.redirect_uris.contains(&query.redirect_uri) {
        return Err(SiteError::NotFound(format!("redirect URI {}", query.redirect_uri)))
            .into_response_error();
    }

    let template = RemoveRedirectUriViewModel {
        action: remove_path(&app.client_id),
        name: app.name,
        redirect_uri: query.redirect_uri,
    };
    template
        .render()
        .map(Html)
        .map_err(SiteError::from)
        .into_response_error()
}

pub(crate) async fn remove_redirect_uri(
    State(state): State<SharedState>,
    user: IdentityUser,
    Path(client_id): Path<String>,
    Form(form): Form<RemoveRedirectUriForm>,
) -> Result<Response, (StatusCode, String)> {
    state
        .store
        .remove_redirect_uri(&client_id, &form.redirect_uri)
        .await
        .into_response_error()?;
    tracing::info!("{} removed {} from {client_id}", user.name, form.redirect_uri);

    found(&application_path(&client_id), HeaderMap::new()).into_response_error()
}
