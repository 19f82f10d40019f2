use oidc_flow_site::{OidcClientOptions, ReferenceData, SiteConfig, SiteError, TestSite};

pub(crate) const DEMO_CLIENT_ID: &str = "demo-web";

/// Start a local site whose relying party uses the given flow
pub(crate) async fn start_local_site(flow: Flow) -> Result<TestSite, SiteError> {
    let mut data = ReferenceData::new();
    data.create_integrated_web_client_application(DEMO_CLIENT_ID);
    data.create_resource_application("orders-api", "Orders", &["read"]);
    data.create_user("alice", "alice-pw");
    data.create_user("bob", "bob-pw");

    let options = match flow {
        Flow::AuthorizationCode => OidcClientOptions::new(DEMO_CLIENT_ID)
            .code_flow()
            .with_resource_scope("Orders", "read"),
        Flow::IdToken => OidcClientOptions::new(DEMO_CLIENT_ID),
    };
    TestSite::start(SiteConfig::new(data, options)).await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    AuthorizationCode,
    IdToken,
}

impl Flow {
    pub(crate) fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "code" => Some(Self::AuthorizationCode),
            "id_token" => Some(Self::IdToken),
            _ => None,
        }
    }

    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationCode => "code",
            Self::IdToken => "id_token",
        }
    }
}
