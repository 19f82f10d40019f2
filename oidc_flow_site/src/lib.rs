//! An in-process web site that plays both sides of an OpenID Connect sign-in:
//! a relying party with a protected page and the identity provider it trusts.
//!
//! Sites are configured from [`ReferenceData`] and [`OidcClientOptions`] and
//! started on an ephemeral loopback port with [`TestSite::start`].

mod applications;
mod config;
mod error;
mod identity;
mod idtoken;
mod reference_data;
mod relying_party;
mod router;
mod server;
mod session;
mod state;
mod storage;
mod utils;

pub use config::{OidcClientOptions, ResourceScope, ResponseMode, ResponseType, SiteConfig};
pub use error::SiteError;
pub use reference_data::{ClientApplication, ReferenceData, ResourceApplication, TestUser};
pub use server::TestSite;
