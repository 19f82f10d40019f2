//! HS256 tokens issued by the identity provider and checked by the relying party

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::config::TOKEN_LIFETIME;
use crate::error::SiteError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct IdTokenClaims {
    pub(crate) iss: String,
    pub(crate) sub: String,
    pub(crate) aud: String,
    pub(crate) exp: i64,
    pub(crate) iat: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) nonce: Option<String>,
    pub(crate) name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct AccessTokenClaims {
    pub(crate) iss: String,
    pub(crate) sub: String,
    pub(crate) aud: Vec<String>,
    pub(crate) exp: i64,
    pub(crate) iat: i64,
    pub(crate) scp: String,
}

/// Subject identifier for a user, stable per issuer
pub(crate) fn subject_for(issuer: &str, user: &str) -> String {
    let digest = ring::digest::digest(
        &ring::digest::SHA256,
        format!("{issuer}|{user}").as_bytes(),
    );
    digest.as_ref()[..16]
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

pub(crate) fn issue_id_token(
    issuer: &str,
    client_id: &str,
    user: &str,
    nonce: Option<&str>,
    secret: &str,
) -> Result<String, SiteError> {
    let now = Utc::now().timestamp();
    let claims = IdTokenClaims {
        iss: issuer.to_string(),
        sub: subject_for(issuer, user),
        aud: client_id.to_string(),
        exp: now + TOKEN_LIFETIME.num_seconds(),
        iat: now,
        nonce: nonce.map(str::to_string),
        name: user.to_string(),
    };
    sign(&claims, secret)
}

pub(crate) fn issue_access_token(
    issuer: &str,
    audiences: Vec<String>,
    user: &str,
    scopes: &[String],
    secret: &str,
) -> Result<String, SiteError> {
    let now = Utc::now().timestamp();
    let claims = AccessTokenClaims {
        iss: issuer.to_string(),
        sub: subject_for(issuer, user),
        aud: audiences,
        exp: now + TOKEN_LIFETIME.num_seconds(),
        iat: now,
        scp: scopes.join(" "),
    };
    sign(&claims, secret)
}

fn sign<T: Serialize>(claims: &T, secret: &str) -> Result<String, SiteError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| SiteError::Crypto(format!("Failed to sign token: {e}")))
}

/// Check signature, issuer, audience and lifetime of an ID token
pub(crate) fn verify_id_token(
    token: &str,
    issuer: &str,
    client_id: &str,
    secret: &str,
) -> Result<IdTokenClaims, SiteError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[issuer]);
    validation.set_audience(&[client_id]);
    validation.leeway = 2;

    let data = decode::<IdTokenClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| SiteError::IdToken(e.to_string()))?;

    tracing::debug!("Verified id_token for {}", data.claims.name);
    Ok(data.claims)
}
