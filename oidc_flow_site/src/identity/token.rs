use axum::{
    Json,
    extract::{Form, State},
};
use chrono::Utc;
use http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::config::TOKEN_LIFETIME;
use crate::error::{IntoResponseError, SiteError};
use crate::idtoken::{issue_access_token, issue_id_token};
use crate::state::{SharedState, SiteState};

#[derive(Debug, Deserialize)]
pub(crate) struct TokenRequest {
    grant_type: String,
    code: Option<String>,
    client_id: Option<String>,
    redirect_uri: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TokenResponse {
    id_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    token_type: String,
    expires_in: i64,
    scope: String,
}

pub(crate) async fn token(
    State(state): State<SharedState>,
    Form(request): Form<TokenRequest>,
) -> Result<Json<TokenResponse>, (StatusCode, String)> {
    redeem_code(&state, request)
        .await
        .map(Json)
        .into_response_error()
}

/// Exchange a single-use authorization code for tokens
async fn redeem_code(state: &SiteState, request: TokenRequest) -> Result<TokenResponse, SiteError> {
    if request.grant_type != "authorization_code" {
        return Err(SiteError::InvalidRequest(format!(
            "unsupported grant_type {}",
            request.grant_type
        )));
    }
    let code = request
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| SiteError::InvalidRequest("code is required".to_string()))?;

    // Taking the code burns it even when the rest of the request is wrong
    let grant = state
        .store
        .take_code(&code)
        .await
        .ok_or_else(|| SiteError::InvalidGrant("unknown or redeemed code".to_string()))?;

    if grant.is_expired(Utc::now()) {
        return Err(SiteError::InvalidGrant("code expired".to_string()));
    }
    if request.client_id.as_deref() != Some(grant.client_id.as_str()) {
        return Err(SiteError::InvalidGrant("client_id mismatch".to_string()));
    }
    if request.redirect_uri.as_deref() != Some(grant.redirect_uri.as_str()) {
        return Err(SiteError::InvalidGrant("redirect_uri mismatch".to_string()));
    }

    let issuer = state.issuer();
    let secret = &state.config.signing_secret;
    let id_token = issue_id_token(
        &issuer,
        &grant.client_id,
        &grant.user,
        grant.nonce.as_deref(),
        secret,
    )?;

    let mut audiences = Vec::new();
    let mut resource_scopes = Vec::new();
    for scope in &grant.scopes {
        if let Some(registered) = state.store.scope(scope).await {
            if !audiences.contains(&registered.resource_id) {
                audiences.push(registered.resource_id);
            }
            resource_scopes.push(registered.value);
        }
    }
    let access_token = if resource_scopes.is_empty() {
        None
    } else {
        Some(issue_access_token(
            &issuer,
            audiences,
            &grant.user,
            &resource_scopes,
            secret,
        )?)
    };

    tracing::info!("Redeemed code for {} ({})", grant.user, grant.client_id);
    Ok(TokenResponse {
        id_token,
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: TOKEN_LIFETIME.num_seconds(),
        scope: grant.scopes.join(" "),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OidcClientOptions, SiteConfig};
    use crate::reference_data::ReferenceData;
    use crate::storage::AuthorizationCode;
    use chrono::Duration;

    const ORIGIN: &str = "http://127.0.0.1:5000";

    fn state() -> SiteState {
        let mut data = ReferenceData::new();
        data.create_integrated_web_client_application("web");
        data.create_resource_application("api", "Orders", &["read"]);
        data.create_user("alice", "pw");
        SiteState::new(SiteConfig::new(data, OidcClientOptions::new("web")), ORIGIN)
            .expect("client builds")
    }

    fn grant(scopes: &[&str]) -> AuthorizationCode {
        AuthorizationCode {
            client_id: "web".to_string(),
            redirect_uri: format!("{ORIGIN}/signin-oidc"),
            user: "alice".to_string(),
            nonce: Some("nn".to_string()),
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
            issued_at: Utc::now(),
        }
    }

    fn request(code: &str) -> TokenRequest {
        TokenRequest {
            grant_type: "authorization_code".to_string(),
            code: Some(code.to_string()),
            client_id: Some("web".to_string()),
            redirect_uri: Some(format!("{ORIGIN}/signin-oidc")),
        }
    }

    #[tokio::test]
    async fn test_redeem_code_once() {
        let state = state();
        state.store.insert_code("c1", grant(&["openid"])).await;

        let response = redeem_code(&state, request("c1")).await.expect("redeemed");
        assert_eq!(response.token_type, "Bearer");
        assert!(response.access_token.is_none());
        assert!(!response.id_token.is_empty());

        assert!(matches!(
            redeem_code(&state, request("c1")).await,
            Err(SiteError::InvalidGrant(_))
        ));
    }

    #[tokio::test]
    async fn test_resource_scope_yields_access_token() {
        let state = state();
        let scope = format!("{ORIGIN}/Identity/v2.0/Orders/read");
        state
            .store
            .insert_code("c1", grant(&["openid", scope.as_str()]))
            .await;

        let response = redeem_code(&state, request("c1")).await.expect("redeemed");
        assert!(response.access_token.is_some());
        assert_eq!(response.scope, format!("openid {scope}"));
    }

    #[tokio::test]
    async fn test_mismatched_client_or_redirect_is_invalid_grant() {
        let state = state();
        state.store.insert_code("c1", grant(&["openid"])).await;
        state.store.insert_code("c2", grant(&["openid"])).await;

        let mut wrong_client = request("c1");
        wrong_client.client_id = Some("other".to_string());
        assert!(matches!(
            redeem_code(&state, wrong_client).await,
            Err(SiteError::InvalidGrant(_))
        ));

        let mut wrong_redirect = request("c2");
        wrong_redirect.redirect_uri = Some(format!("{ORIGIN}/elsewhere"));
        assert!(matches!(
            redeem_code(&state, wrong_redirect).await,
            Err(SiteError::InvalidGrant(_))
        ));
    }

    #[tokio::test]
    async fn test_expired_code_is_invalid_grant() {
        let state = state();
        let mut old = grant(&["openid"]);
        old.issued_at = Utc::now() - Duration::hours(1);
        state.store.insert_code("c1", old).await;

        assert!(matches!(
            redeem_code(&state, request("c1")).await,
            Err(SiteError::InvalidGrant(_))
        ));
    }

    #[tokio::test]
    async fn test_unsupported_grant_type() {
        let mut req = request("c1");
        req.grant_type = "password".to_string();
        assert!(matches!(
            redeem_code(&state(), req).await,
            Err(SiteError::InvalidRequest(_))
        ));
    }
}
