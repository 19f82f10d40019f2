//! The identity provider half of the site: authorize, login, token and
//! discovery endpoints under `/tfp/{tenant}/{policy}`.

mod authorize;
mod discovery;
mod login;
mod token;

pub(crate) use authorize::authorize;
pub(crate) use discovery::openid_configuration;
pub(crate) use login::{login_page, login_submit};
pub(crate) use token::token;

/// Scopes every client may request without registering a resource
const STANDARD_SCOPES: [&str; 4] = ["openid", "profile", "email", "offline_access"];
