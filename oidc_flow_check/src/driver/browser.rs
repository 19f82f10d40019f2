use chrono::Utc;
use http::{
    HeaderMap, HeaderName, HeaderValue, Method,
    header::{COOKIE, LOCATION, SET_COOKIE},
};
use reqwest::{Client, redirect::Policy};
use url::Url;

use super::{USER_HINT_HEADER, step::FlowStep};
use crate::config::FlowConfig;
use crate::cookies::{CookieJar, SetCookie};
use crate::errors::FlowError;
use crate::extract::{Form, FormMethod};
use crate::response_assert::assert_redirect;

/// Browser stand-in that performs one HTTP exchange per call.
///
/// Redirects are never followed automatically so that every hop can be
/// inspected. Cookies live in a [`CookieJar`] owned by the driver and are
/// replayed on later requests the way a browser would.
#[derive(Debug)]
pub struct FlowDriver {
    client: Client,
    base_url: Url,
    jar: CookieJar,
    default_headers: HeaderMap,
    hops: usize,
}

impl FlowDriver {
    /// Create a driver that resolves relative URLs against `base_url`
    pub fn new(base_url: &str) -> Result<Self, FlowError> {
        let client = Client::builder()
            .redirect(Policy::none())
            .build()
            .map_err(|e| FlowError::Transport(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: Url::parse(base_url)?,
            jar: CookieJar::new(),
            default_headers: HeaderMap::new(),
            hops: 0,
        })
    }

    /// Create a driver for the configured origin, carrying the user hint if any
    pub fn from_config(config: &FlowConfig) -> Result<Self, FlowError> {
        let driver = Self::new(&config.origin)?;
        match &config.user_hint {
            Some(user) => driver.with_header(USER_HINT_HEADER, user),
            None => Ok(driver),
        }
    }

    /// Send `name: value` on every request this driver issues
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, FlowError> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| FlowError::InvalidHeader(format!("{name}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| FlowError::InvalidHeader(format!("{name}: {e}")))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn jar(&self) -> &CookieJar {
        &self.jar
    }

    pub fn jar_mut(&mut self) -> &mut CookieJar {
        &mut self.jar
    }

    /// Number of exchanges issued so far
    pub fn hops(&self) -> usize {
        self.hops
    }

    /// Resolve `url` against the base URL; absolute URLs pass through
    pub fn resolve(&self, url: &str) -> Result<Url, FlowError> {
        Ok(self.base_url.join(url)?)
    }

    /// Issue a GET without following redirects
    pub async fn get(&mut self, url: &str) -> Result<FlowStep, FlowError> {
        let url = self.resolve(url)?;
        self.send(Method::GET, url, None).await
    }

    /// Submit `form` with its current field values
    pub async fn send_form(&mut self, form: &Form) -> Result<FlowStep, FlowError> {
        match form.method {
            FormMethod::Post => {
                self.send(Method::POST, form.action.clone(), Some(form.fields.as_slice()))
                    .await
            }
            FormMethod::Get => {
                let mut url = form.action.clone();
                url.query_pairs_mut()
                    .clear()
                    .extend_pairs(form.fields.iter().map(|(k, v)| (k.as_str(), v.as_str())));
                self.send(Method::GET, url, None).await
            }
        }
    }

    /// Follow the redirect of `step`. Fails unless `step` is a 3xx with a `Location`.
    pub async fn follow(&mut self, step: &FlowStep) -> Result<FlowStep, FlowError> {
        let location = assert_redirect(step)?;
        self.send(Method::GET, location, None).await
    }

    #[tracing::instrument(skip(self, form), fields(hop = self.hops + 1))]
    async fn send(
        &mut self,
        method: Method,
        url: Url,
        form: Option<&[(String, String)]>,
    ) -> Result<FlowStep, FlowError> {
        self.hops += 1;
        let hop = self.hops;

        let mut request = self
            .client
            .request(method.clone(), url.clone())
            .headers(self.default_headers.clone());
        if let Some(cookie) = self.jar.header_for(&url) {
            request = request.header(COOKIE, cookie);
        }
        if let Some(fields) = form {
            request = request.form(fields);
        }

        let response = request.send().await?;
        let received_at = Utc::now();
        let status = response.status();
        let headers = response.headers().clone();

        let set_cookies: Vec<SetCookie> = headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|raw| SetCookie::parse_at(raw, received_at))
            .collect();
        for cookie in &set_cookies {
            self.jar.store(cookie, &url);
        }

        let location = match headers.get(LOCATION) {
            Some(value) => {
                let raw = value
                    .to_str()
                    .map_err(|e| FlowError::InvalidHeader(format!("location: {e}")))?;
                Some(url.join(raw)?)
            }
            None => None,
        };

        let body = response.text().await?;

        tracing::debug!(
            "hop #{hop}: {method} {url} -> {status}, {} cookie(s) set",
            set_cookies.len()
        );

        Ok(FlowStep {
            hop,
            method,
            url,
            status,
            headers,
            set_cookies,
            location,
            body,
        })
    }
}
