//! Applications, resources and users the site is seeded with.

use crate::config::{CALLBACK_PATH, TENANT};

/// A web application that signs users in through the identity provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientApplication {
    pub client_id: String,
    pub name: String,
    /// Absolute URIs, or site-relative paths resolved against the site origin
    pub redirect_uris: Vec<String>,
}

/// An API protected by the identity provider, exposing named scopes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceApplication {
    pub id: String,
    pub name: String,
    pub scopes: Vec<String>,
}

impl ResourceApplication {
    /// Full scope value as requested by clients:
    /// `{origin}/{tenant}/v2.0/{ResourceName}/{scope}`
    pub fn scope_value(&self, origin: &str, scope: &str) -> String {
        scope_value(origin, &self.name, scope)
    }
}

pub(crate) fn scope_value(origin: &str, resource: &str, scope: &str) -> String {
    format!("{origin}/{TENANT}/v2.0/{resource}/{scope}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestUser {
    pub name: String,
    pub password: String,
}

/// Seed data for a site instance. The first user created is the default user.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    applications: Vec<ClientApplication>,
    resources: Vec<ResourceApplication>,
    users: Vec<TestUser>,
}

impl ReferenceData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a web application whose callback is the site's own `/signin-oidc`
    pub fn create_integrated_web_client_application(
        &mut self,
        client_id: &str,
    ) -> &ClientApplication {
        let app = ClientApplication {
            client_id: client_id.to_string(),
            name: client_id.to_string(),
            redirect_uris: vec![CALLBACK_PATH.to_string()],
        };
        upsert(&mut self.applications, app, |a| a.client_id == client_id)
    }

    pub fn create_resource_application(
        &mut self,
        id: &str,
        name: &str,
        scopes: &[&str],
    ) -> &ResourceApplication {
        let resource = ResourceApplication {
            id: id.to_string(),
            name: name.to_string(),
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
        };
        upsert(&mut self.resources, resource, |r| r.id == id)
    }

    pub fn create_user(&mut self, name: &str, password: &str) -> &TestUser {
        let user = TestUser {
            name: name.to_string(),
            password: password.to_string(),
        };
        upsert(&mut self.users, user, |u| u.name == name)
    }

    pub fn application(&self, client_id: &str) -> Option<&ClientApplication> {
        self.applications.iter().find(|a| a.client_id == client_id)
    }

    pub fn get_user(&self, name: &str) -> Option<&TestUser> {
        self.users.iter().find(|u| u.name == name)
    }

    pub fn get_default_user(&self) -> Option<&TestUser> {
        self.users.first()
    }

    pub fn applications(&self) -> &[ClientApplication] {
        &self.applications
    }

    pub fn resources(&self) -> &[ResourceApplication] {
        &self.resources
    }

    pub fn users(&self) -> &[TestUser] {
        &self.users
    }
}

/// Replace the entry `same` selects in place, or append
fn upsert<T>(items: &mut Vec<T>, item: T, same: impl Fn(&T) -> bool) -> &T {
    match items.iter().position(same) {
        Some(idx) => {
            items[idx] = item;
            &items[idx]
        }
        None => {
            items.push(item);
            &items[items.len() - 1]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_web_client_uses_site_callback() {
        let mut data = ReferenceData::new();
        let app = data.create_integrated_web_client_application("web");

        assert_eq!(app.client_id, "web");
        assert_eq!(app.redirect_uris, vec!["/signin-oidc"]);
        assert!(data.application("web").is_some());
        assert!(data.application("other").is_none());
    }

    #[test]
    fn test_resource_scope_value() {
        let mut data = ReferenceData::new();
        let api = data.create_resource_application("api-id", "Orders", &["read", "write"]);

        assert_eq!(
            api.scope_value("https://localhost", "read"),
            "https://localhost/Identity/v2.0/Orders/read"
        );
        assert_eq!(data.resources()[0].scopes, vec!["read", "write"]);
    }

    #[test]
    fn test_first_user_is_default() {
        let mut data = ReferenceData::new();
        assert!(data.get_default_user().is_none());

        data.create_user("alice", "one");
        data.create_user("bob", "two");

        assert_eq!(data.get_default_user().map(|u| u.name.as_str()), Some("alice"));
        assert_eq!(data.get_user("bob").map(|u| u.password.as_str()), Some("two"));
        assert!(data.get_user("carol").is_none());
    }

    #[test]
    fn test_recreating_user_replaces_password() {
        let mut data = ReferenceData::new();
        data.create_user("alice", "one");
        data.create_user("bob", "three");
        data.create_user("alice", "two");

        assert_eq!(data.users().len(), 2);
        assert_eq!(data.get_default_user().map(|u| u.name.as_str()), Some("alice"));
        assert_eq!(data.get_user("alice").map(|u| u.password.as_str()), Some("two"));
    }
}
