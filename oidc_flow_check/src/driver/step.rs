use http::{HeaderMap, Method, StatusCode, header::CONTENT_TYPE};
use url::Url;

use crate::cookies::SetCookie;

/// One request/response exchange of a flow
#[derive(Debug, Clone)]
pub struct FlowStep {
    /// 1-based position of the exchange within its driver
    pub hop: usize,
    pub method: Method,
    /// URL the request was sent to
    pub url: Url,
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Parsed `Set-Cookie` headers in the order they were received
    pub set_cookies: Vec<SetCookie>,
    /// `Location` resolved against the request URL
    pub location: Option<Url>,
    pub body: String,
}

impl FlowStep {
    pub fn is_redirect(&self) -> bool {
        self.status.is_redirection()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Last `Set-Cookie` with exactly this name
    pub fn set_cookie(&self, name: &str) -> Option<&SetCookie> {
        self.set_cookies.iter().rev().find(|c| c.name == name)
    }

    pub fn set_cookie_names(&self) -> Vec<&str> {
        self.set_cookies.iter().map(|c| c.name.as_str()).collect()
    }
}
