use std::sync::Arc;
use std::time::Duration;

use crate::config::{CALLBACK_PATH, IDP_PREFIX, SiteConfig};
use crate::error::SiteError;
use crate::storage::SiteStore;

pub(crate) type SharedState = Arc<SiteState>;

/// Per-instance state shared by every handler of one site
#[derive(Debug)]
pub(crate) struct SiteState {
    pub(crate) config: SiteConfig,
    pub(crate) store: SiteStore,
    /// `scheme://host:port` the site is reachable at
    pub(crate) origin: String,
    /// Back channel from the relying party to the token endpoint
    pub(crate) client: reqwest::Client,
}

impl SiteState {
    pub(crate) fn new(config: SiteConfig, origin: &str) -> Result<Self, SiteError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(32)
            .build()
            .map_err(|e| SiteError::Server(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            store: SiteStore::seed(&config.reference_data, origin),
            config,
            origin: origin.to_string(),
            client,
        })
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{path}", self.origin)
    }

    pub(crate) fn issuer(&self) -> String {
        self.url(&format!("{}/v2.0/", *IDP_PREFIX))
    }

    /// Redirect URI the relying party registers and sends
    pub(crate) fn callback_uri(&self) -> String {
        self.url(CALLBACK_PATH)
    }
}
