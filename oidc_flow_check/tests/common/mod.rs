use std::error::Error;
use std::sync::Once;

use oidc_flow_check::{FlowConfig, FlowDriver, FlowError};
use oidc_flow_site::{OidcClientOptions, ReferenceData, SiteConfig, TestSite};
use tracing_subscriber::EnvFilter;

pub type TestResult = Result<(), Box<dyn Error>>;

pub const RESOURCE_NAME: &str = "Orders";

static INIT: Once = Once::new();

/// Load `.env_test` and install a test-writer subscriber, once per binary
pub fn init_test_environment() {
    INIT.call_once(|| {
        if dotenvy::from_filename(".env_test").is_err() {
            let _ = dotenvy::dotenv();
        }
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("oidc_flow_check=debug,oidc_flow_site=debug,warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// A fresh client id so every test registers its own application
pub fn new_client_id() -> String {
    format!("web-{}", uuid::Uuid::new_v4())
}

/// The client under test, the `Orders` API with a `read` scope and two users
pub fn reference_data(client_id: &str) -> ReferenceData {
    let mut data = ReferenceData::new();
    data.create_integrated_web_client_application(client_id);
    data.create_resource_application("orders-api", RESOURCE_NAME, &["read"]);
    data.create_user("alice", "alice-pw");
    data.create_user("bob", "bob-pw");
    data
}

/// A running site together with the validator configuration pointing at it
pub struct SiteFixture {
    pub site: TestSite,
    pub client_id: String,
    pub flow: FlowConfig,
}

impl SiteFixture {
    /// Start a site for `client_id` configured by `options`
    pub async fn start(
        client_id: &str,
        options: OidcClientOptions,
        auto_sign_in: bool,
    ) -> Result<Self, Box<dyn Error>> {
        init_test_environment();
        let config =
            SiteConfig::new(reference_data(client_id), options).with_auto_sign_in(auto_sign_in);
        let site = TestSite::start(config).await?;
        let flow = FlowConfig::for_origin(&site.base_url);

        Ok(Self {
            site,
            client_id: client_id.to_string(),
            flow,
        })
    }

    /// Authorization code flow with query response mode and auto sign-in
    pub async fn code_flow() -> Result<Self, Box<dyn Error>> {
        let client_id = new_client_id();
        Self::start(&client_id, OidcClientOptions::new(&client_id).code_flow(), true).await
    }

    /// ID token flow with form_post response mode and auto sign-in
    pub async fn id_token_flow() -> Result<Self, Box<dyn Error>> {
        let client_id = new_client_id();
        Self::start(&client_id, OidcClientOptions::new(&client_id), true).await
    }

    /// A driver with an empty cookie jar
    pub fn driver(&self) -> Result<FlowDriver, FlowError> {
        FlowDriver::from_config(&self.flow)
    }
}
