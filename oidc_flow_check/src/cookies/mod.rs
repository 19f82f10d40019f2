mod compare;
mod criteria;
mod jar;
mod types;

pub use compare::{CookieField, CookieReport, FieldMismatch, compare};
pub use criteria::ComparisonCriteria;
pub use jar::CookieJar;
pub use types::{ExpectedCookie, Expiry, SetCookie};

pub(crate) use compare::{compare_with_tolerance, name_matches};
