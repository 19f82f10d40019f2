use serde::Serialize;

use crate::config::RESOURCE_PATH;
use crate::driver::FlowStep;

/// How the login hop signs a user in
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoginMode {
    /// The site signs the default (or hinted) user in on a plain GET
    #[default]
    Automatic,
    /// Fill and submit the login form
    Credentials { username: String, password: String },
}

/// What a scenario requests and how it signs in
#[derive(Debug, Clone)]
pub struct FlowPlan {
    /// Protected resource the flow starts and ends on
    pub resource_path: String,
    pub login: LoginMode,
}

impl FlowPlan {
    pub fn new() -> Self {
        Self {
            resource_path: RESOURCE_PATH.clone(),
            login: LoginMode::Automatic,
        }
    }

    pub fn with_resource_path(mut self, path: &str) -> Self {
        self.resource_path = path.to_string();
        self
    }

    pub fn with_credentials(mut self, username: &str, password: &str) -> Self {
        self.login = LoginMode::Credentials {
            username: username.to_string(),
            password: password.to_string(),
        };
        self
    }
}

impl Default for FlowPlan {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HopSummary {
    pub hop: usize,
    pub method: String,
    pub url: String,
    pub status: u16,
    pub location: Option<String>,
    pub cookies_set: Vec<String>,
}

impl From<&FlowStep> for HopSummary {
    fn from(step: &FlowStep) -> Self {
        Self {
            hop: step.hop,
            method: step.method.to_string(),
            url: step.url.to_string(),
            status: step.status.as_u16(),
            location: step.location.as_ref().map(ToString::to_string),
            cookies_set: step.set_cookies.iter().map(|c| c.name.clone()).collect(),
        }
    }
}

/// Result of a flow that passed every hop
#[derive(Debug, Clone, Serialize)]
pub struct FlowOutcome {
    pub hops: Vec<HopSummary>,
    /// `state` carried from the authorize request to the callback
    pub state: String,
    /// Authorization code, for code flows
    pub code: Option<String>,
    /// Cookies held by the driver once the flow completed
    pub cookies: Vec<String>,
}
