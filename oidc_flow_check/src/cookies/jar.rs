use cookie::Cookie;
use cookie_store::CookieStore;
use url::Url;

use super::types::SetCookie;

/// Browser-like cookie store owned by a single flow driver.
///
/// Storage, domain and path matching, expiry and `Secure` handling follow
/// RFC 6265 as implemented by [`cookie_store`]. Loopback hosts and
/// `localhost` count as secure contexts so that in-process sites served over
/// plain HTTP behave like their HTTPS deployments.
#[derive(Debug, Default)]
pub struct CookieJar {
    store: CookieStore,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a `Set-Cookie` received in response to `request_url`.
    /// Expired cookies remove any stored cookie with the same name, domain and path.
    pub fn store(&mut self, cookie: &SetCookie, request_url: &Url) {
        let raw = match Cookie::parse(cookie.raw.clone()) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::debug!("Not storing cookie {}: {e}", cookie.name);
                return;
            }
        };

        tracing::debug!(
            "Applying cookie {} from {}",
            cookie.name,
            request_url.host_str().unwrap_or_default()
        );
        self.store
            .store_response_cookies(std::iter::once(raw), request_url);
    }

    /// Value of the `Cookie` request header for `url`
    pub fn header_for(&self, url: &Url) -> Option<String> {
        let pairs: Vec<String> = self
            .store
            .get_request_values(url)
            .map(|(name, value)| format!("{name}={value}"))
            .collect();

        (!pairs.is_empty()).then(|| pairs.join("; "))
    }

    /// Value of the first live cookie called `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.store
            .iter_unexpired()
            .find(|c| c.name() == name)
            .map(|c| c.value())
    }

    pub fn names(&self) -> Vec<&str> {
        self.store.iter_unexpired().map(|c| c.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.store.iter_unexpired().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.store.clear();
    }
}
