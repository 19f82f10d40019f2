use axum::{Json, extract::State};
use serde::Serialize;

use crate::config::{AUTHORIZE_PATH, TOKEN_PATH};
use crate::state::SharedState;

use super::STANDARD_SCOPES;

#[derive(Debug, Serialize)]
pub(crate) struct ProviderMetadata {
    issuer: String,
    authorization_endpoint: String,
    token_endpoint: String,
    response_types_supported: Vec<&'static str>,
    response_modes_supported: Vec<&'static str>,
    scopes_supported: Vec<String>,
    subject_types_supported: Vec<&'static str>,
    id_token_signing_alg_values_supported: Vec<&'static str>,
}

pub(crate) async fn openid_configuration(State(state): State<SharedState>) -> Json<ProviderMetadata> {
    let mut scopes_supported: Vec<String> = STANDARD_SCOPES.iter().map(|s| s.to_string()).collect();
    scopes_supported.extend(state.store.scope_values().await);

    Json(ProviderMetadata {
        issuer: state.issuer(),
        authorization_endpoint: state.url(&AUTHORIZE_PATH),
        token_endpoint: state.url(&TOKEN_PATH),
        response_types_supported: vec!["code", "id_token"],
        response_modes_supported: vec!["query", "form_post"],
        scopes_supported,
        subject_types_supported: vec!["pairwise"],
        id_token_signing_alg_values_supported: vec!["HS256"],
    })
}
