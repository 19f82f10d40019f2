//! In-memory state of one site instance.
//!
//! Everything lives behind a single mutex; a site instance serves one
//! scenario at a time and never shares its store with another instance.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::config::CODE_LIFETIME;
use crate::error::SiteError;
use crate::reference_data::{ClientApplication, ReferenceData, TestUser, scope_value};

/// A scope value a client may request, and the resource it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RegisteredScope {
    pub(crate) value: String,
    pub(crate) resource_id: String,
}

/// One-time authorization code and the request it answers
#[derive(Debug, Clone)]
pub(crate) struct AuthorizationCode {
    pub(crate) client_id: String,
    pub(crate) redirect_uri: String,
    pub(crate) user: String,
    pub(crate) nonce: Option<String>,
    pub(crate) scopes: Vec<String>,
    pub(crate) issued_at: DateTime<Utc>,
}

impl AuthorizationCode {
    pub(crate) fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.issued_at > *CODE_LIFETIME
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ApplicationSession {
    pub(crate) client_id: String,
    pub(crate) user: String,
}

#[derive(Debug, Clone)]
pub(crate) struct RelyingPartySession {
    pub(crate) user: String,
    pub(crate) subject: String,
}

#[derive(Debug, Default)]
struct StoreInner {
    applications: HashMap<String, ClientApplication>,
    scopes: Vec<RegisteredScope>,
    users: Vec<TestUser>,
    /// Identity provider login sessions, keyed by cookie value
    logins: HashMap<String, String>,
    application_sessions: HashMap<String, ApplicationSession>,
    codes: HashMap<String, AuthorizationCode>,
    /// Relying-party sessions, keyed by cookie value
    sessions: HashMap<String, RelyingPartySession>,
}

#[derive(Debug)]
pub(crate) struct SiteStore {
    inner: Mutex<StoreInner>,
}

impl SiteStore {
    /// Seed a store from reference data, resolving relative redirect URIs
    /// and resource scopes against `origin`
    pub(crate) fn seed(data: &ReferenceData, origin: &str) -> Self {
        let applications = data
            .applications()
            .iter()
            .map(|app| {
                let redirect_uris = app
                    .redirect_uris
                    .iter()
                    .map(|uri| {
                        if uri.starts_with('/') {
                            format!("{origin}{uri}")
                        } else {
                            uri.clone()
                        }
                    })
                    .collect();
                let app = ClientApplication {
                    redirect_uris,
                    ..app.clone()
                };
                (app.client_id.clone(), app)
            })
            .collect();

        let scopes = data
            .resources()
            .iter()
            .flat_map(|resource| {
                resource.scopes.iter().map(|scope| RegisteredScope {
                    value: scope_value(origin, &resource.name, scope),
                    resource_id: resource.id.clone(),
                })
            })
            .collect();

        Self {
            inner: Mutex::new(StoreInner {
                applications,
                scopes,
                users: data.users().to_vec(),
                ..StoreInner::default()
            }),
        }
    }

    pub(crate) async fn application(&self, client_id: &str) -> Option<ClientApplication> {
        self.inner.lock().await.applications.get(client_id).cloned()
    }

    pub(crate) async fn remove_redirect_uri(
        &self,
        client_id: &str,
        redirect_uri: &str,
    ) -> Result<(), SiteError> {
        let mut inner = self.inner.lock().await;
        let app = inner
            .applications
            .get_mut(client_id)
            .ok_or_else(|| SiteError::NotFound(format!("application {client_id}")))?;
        let before = app.redirect_uris.len();
        app.redirect_uris.retain(|uri| uri != redirect_uri);
        if app.redirect_uris.len() == before {
            return Err(SiteError::NotFound(format!("redirect URI {redirect_uri}")));
        }
        tracing::info!("Removed redirect URI {redirect_uri} from {client_id}");
        Ok(())
    }

    pub(crate) async fn scope(&self, value: &str) -> Option<RegisteredScope> {
        self.inner
            .lock()
            .await
            .scopes
            .iter()
            .find(|s| s.value == value)
            .cloned()
    }

    pub(crate) async fn scope_values(&self) -> Vec<String> {
        self.inner
            .lock()
            .await
            .scopes
            .iter()
            .map(|s| s.value.clone())
            .collect()
    }

    pub(crate) async fn user(&self, name: &str) -> Option<TestUser> {
        self.inner
            .lock()
            .await
            .users
            .iter()
            .find(|u| u.name == name)
            .cloned()
    }

    pub(crate) async fn default_user(&self) -> Option<TestUser> {
        self.inner.lock().await.users.first().cloned()
    }

    pub(crate) async fn insert_login(&self, session_id: &str, user: &str) {
        self.inner
            .lock()
            .await
            .logins
            .insert(session_id.to_string(), user.to_string());
    }

    pub(crate) async fn login(&self, session_id: &str) -> Option<String> {
        self.inner.lock().await.logins.get(session_id).cloned()
    }

    pub(crate) async fn insert_application_session(
        &self,
        session_id: &str,
        session: ApplicationSession,
    ) {
        self.inner
            .lock()
            .await
            .application_sessions
            .insert(session_id.to_string(), session);
    }

    pub(crate) async fn application_session(&self, session_id: &str) -> Option<ApplicationSession> {
        self.inner
            .lock()
            .await
            .application_sessions
            .get(session_id)
            .cloned()
    }

    pub(crate) async fn insert_code(&self, code: &str, grant: AuthorizationCode) {
        self.inner
            .lock()
            .await
            .codes
            .insert(code.to_string(), grant);
    }

    /// Codes are single use: taking one removes it
    pub(crate) async fn take_code(&self, code: &str) -> Option<AuthorizationCode> {
        self.inner.lock().await.codes.remove(code)
    }

    pub(crate) async fn insert_session(&self, session_id: &str, session: RelyingPartySession) {
        self.inner
            .lock()
            .await
            .sessions
            .insert(session_id.to_string(), session);
    }

    pub(crate) async fn session(&self, session_id: &str) -> Option<RelyingPartySession> {
        self.inner.lock().await.sessions.get(session_id).cloned()
    }
}
