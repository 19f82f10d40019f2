use http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum SiteError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Unknown client: {0}")]
    UnknownClient(String),

    #[error("Redirect URI is not registered: {0}")]
    InvalidRedirectUri(String),

    #[error("Unsupported response type: {0}")]
    UnsupportedResponseType(String),

    #[error("Unsupported response mode: {0}")]
    UnsupportedResponseMode(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Correlation failed")]
    CorrelationFailed,

    #[error("Nonce mismatch")]
    NonceMismatch,

    #[error("Invalid grant: {0}")]
    InvalidGrant(String),

    #[error("Token exchange error: {0}")]
    TokenExchange(String),

    #[error("Id token error: {0}")]
    IdToken(String),

    #[error("Remote failure: {0}")]
    RemoteFailure(String),

    #[error("Unknown user: {0}")]
    UnknownUser(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Serde error: {0}")]
    Serde(String),

    #[error("Template error: {0}")]
    Template(String),
}

impl From<askama::Error> for SiteError {
    fn from(err: askama::Error) -> Self {
        Self::Template(err.to_string())
    }
}

impl From<serde_json::Error> for SiteError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}

/// Helper trait for converting errors to a standard response error format
pub(crate) trait IntoResponseError<T> {
    fn into_response_error(self) -> Result<T, (StatusCode, String)>;
}

impl<T> IntoResponseError<T> for Result<T, SiteError> {
    fn into_response_error(self) -> Result<T, (StatusCode, String)> {
        self.map_err(|e| {
            let status = match e {
                SiteError::UnknownClient(_)
                | SiteError::InvalidRedirectUri(_)
                | SiteError::UnsupportedResponseType(_)
                | SiteError::UnsupportedResponseMode(_)
                | SiteError::InvalidRequest(_)
                | SiteError::InvalidState(_)
                | SiteError::CorrelationFailed
                | SiteError::NonceMismatch
                | SiteError::InvalidGrant(_)
                | SiteError::TokenExchange(_)
                | SiteError::IdToken(_)
                | SiteError::RemoteFailure(_)
                | SiteError::UnknownUser(_) => StatusCode::BAD_REQUEST,
                SiteError::NotFound(_) => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            tracing::warn!("Request failed with {status}: {e}");
            (status, e.to_string())
        })
    }
}
