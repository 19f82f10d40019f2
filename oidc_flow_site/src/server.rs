use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::config::SiteConfig;
use crate::error::SiteError;
use crate::router::site_router;
use crate::state::SiteState;

/// A running in-process site. The server stops when the handle is dropped.
#[derive(Debug)]
pub struct TestSite {
    /// `http://host:port` of the bound listener
    pub base_url: String,
    server_handle: JoinHandle<()>,
}

impl TestSite {
    /// Validate `config`, bind its address and serve until shut down.
    ///
    /// The default bind address asks for an ephemeral loopback port, so many
    /// sites can run side by side in one test binary.
    pub async fn start(config: SiteConfig) -> Result<Self, SiteError> {
        let addr = config.validate()?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| SiteError::Server(format!("Failed to bind {addr}: {e}")))?;
        let local = listener
            .local_addr()
            .map_err(|e| SiteError::Server(format!("Failed to read local address: {e}")))?;
        let base_url = origin_for(local);

        let state = Arc::new(SiteState::new(config, &base_url)?);
        let app = site_router(state);

        tracing::info!("Test site listening on {base_url}");
        let server_handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("Test site stopped: {e}");
            }
        });

        Ok(Self {
            base_url,
            server_handle,
        })
    }

    /// Absolute URL of `path` on this site
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub fn shutdown(self) {
        drop(self);
    }
}

impl Drop for TestSite {
    fn drop(&mut self) {
        self.server_handle.abort();
    }
}

/// Browsers cannot reach an unspecified address, so those map to loopback
fn origin_for(addr: SocketAddr) -> String {
    let ip = if addr.ip().is_unspecified() {
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    } else {
        addr.ip()
    };
    format!("http://{}", SocketAddr::new(ip, addr.port()))
}
