use thiserror::Error;

use crate::cookies::CookieReport;

/// Errors raised while driving or checking a flow.
///
/// Every hop-level variant carries the 1-based hop number of the exchange that
/// diverged so a failing scenario points at the exact request. Extractors used
/// on their own report hop 0.
#[derive(Debug, Error, Clone)]
pub enum FlowError {
    #[error("hop #{hop}: expected {expected}, got {actual}")]
    UnexpectedStatus {
        hop: usize,
        expected: String,
        actual: u16,
    },

    #[error("hop #{hop}: missing parameter '{name}'")]
    MissingParameter { hop: usize, name: String },

    #[error("hop #{hop}: parameter '{name}' appears more than once")]
    AmbiguousParameter { hop: usize, name: String },

    #[error("hop #{hop}: parameter '{name}' expected '{expected}', got '{actual}'")]
    ParameterMismatch {
        hop: usize,
        name: String,
        expected: String,
        actual: String,
    },

    #[error("hop #{hop}: cookie '{cookie}' does not match: {report}")]
    CookieMismatch {
        hop: usize,
        cookie: String,
        report: CookieReport,
    },

    #[error("hop #{hop}: no form matching '{selector}'")]
    FormNotFound { hop: usize, selector: String },

    #[error("hop #{hop}: expected content type {expected}, got {actual}")]
    UnexpectedContentType {
        hop: usize,
        expected: String,
        actual: String,
    },

    #[error("hop #{hop}: missing header '{name}'")]
    MissingHeader { hop: usize, name: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl FlowError {
    /// Hop the error was raised at, if it belongs to one
    pub fn hop(&self) -> Option<usize> {
        match self {
            Self::UnexpectedStatus { hop, .. }
            | Self::MissingParameter { hop, .. }
            | Self::AmbiguousParameter { hop, .. }
            | Self::ParameterMismatch { hop, .. }
            | Self::CookieMismatch { hop, .. }
            | Self::FormNotFound { hop, .. }
            | Self::UnexpectedContentType { hop, .. }
            | Self::MissingHeader { hop, .. } => Some(*hop),
            Self::InvalidUrl(_) | Self::InvalidHeader(_) | Self::Transport(_) => None,
        }
    }

    /// Attribute an error raised outside a hop (hop 0) to `hop`
    pub(crate) fn at_hop(mut self, at: usize) -> Self {
        match &mut self {
            Self::UnexpectedStatus { hop, .. }
            | Self::MissingParameter { hop, .. }
            | Self::AmbiguousParameter { hop, .. }
            | Self::ParameterMismatch { hop, .. }
            | Self::CookieMismatch { hop, .. }
            | Self::FormNotFound { hop, .. }
            | Self::UnexpectedContentType { hop, .. }
            | Self::MissingHeader { hop, .. } => *hop = at,
            Self::InvalidUrl(_) | Self::InvalidHeader(_) | Self::Transport(_) => {}
        }
        self
    }
}

impl From<reqwest::Error> for FlowError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<url::ParseError> for FlowError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}
