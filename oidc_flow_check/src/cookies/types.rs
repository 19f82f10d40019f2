use chrono::{DateTime, Duration, Utc};
use cookie::Cookie;

/// A parsed `Set-Cookie` response header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
    pub path: Option<String>,
    pub domain: Option<String>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<String>,
    /// Value of the `Expires` attribute
    pub expires: Option<DateTime<Utc>>,
    /// Value of the `Max-Age` attribute in seconds
    pub max_age: Option<i64>,
    /// When the header was received, used to resolve `Max-Age`
    pub received_at: DateTime<Utc>,
    pub raw: String,
}

impl SetCookie {
    /// Parse a header value received now. Returns `None` for malformed headers,
    /// which a browser would ignore as well.
    pub fn parse(raw: &str) -> Option<Self> {
        Self::parse_at(raw, Utc::now())
    }

    pub fn parse_at(raw: &str, received_at: DateTime<Utc>) -> Option<Self> {
        let parsed = match Cookie::parse(raw) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Ignoring malformed Set-Cookie header {raw:?}: {e}");
                return None;
            }
        };

        let expires = parsed
            .expires_datetime()
            .and_then(|dt| DateTime::from_timestamp(dt.unix_timestamp(), 0));

        Some(Self {
            name: parsed.name().to_string(),
            value: parsed.value().to_string(),
            path: parsed.path().map(str::to_string),
            domain: parsed.domain().map(str::to_lowercase),
            secure: parsed.secure().unwrap_or(false),
            http_only: parsed.http_only().unwrap_or(false),
            same_site: parsed.same_site().map(|s| s.to_string()),
            expires,
            max_age: parsed.max_age().map(|d| d.whole_seconds()),
            received_at,
            raw: raw.to_string(),
        })
    }

    /// Instant the cookie stops being valid; `Max-Age` wins over `Expires`.
    /// `None` means a session cookie. A `Max-Age` past the representable
    /// range saturates to the latest (or earliest) instant.
    pub fn expiry_instant(&self) -> Option<DateTime<Utc>> {
        match self.max_age {
            Some(max_age) => Some(
                Duration::try_seconds(max_age)
                    .and_then(|lifetime| self.received_at.checked_add_signed(lifetime))
                    .unwrap_or(if max_age > 0 {
                        DateTime::<Utc>::MAX_UTC
                    } else {
                        DateTime::<Utc>::MIN_UTC
                    }),
            ),
            None => self.expires,
        }
    }

    /// True when the header carries an `Expires` of exactly the Unix epoch
    pub fn is_epoch_expiry(&self) -> bool {
        self.expires.is_some_and(|t| t.timestamp() == 0)
    }

    /// True when a cookie jar receiving this header at `now` would drop the cookie
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry_instant().is_some_and(|t| t <= now)
    }
}

/// Expiry a cookie is expected to carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// No `Expires` and no `Max-Age`
    Session,
    /// Expires at the given instant, within the comparison tolerance
    At(DateTime<Utc>),
    /// Removed by the server: `Expires` equals the Unix epoch
    Delete,
}

/// Template an actual `Set-Cookie` header is compared against.
///
/// Depending on the comparison criteria `name` is matched exactly or as a
/// prefix, which is how per-request cookies such as
/// `.AspNetCore.Correlation.OpenIdConnect.<id>` are expected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedCookie {
    pub name: String,
    pub value: String,
    pub path: Option<String>,
    pub domain: Option<String>,
    pub secure: bool,
    pub http_only: bool,
    pub expiry: Expiry,
}

impl ExpectedCookie {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            path: None,
            domain: None,
            secure: false,
            http_only: false,
            expiry: Expiry::Session,
        }
    }

    /// Template that is only ever compared by name
    pub fn named(name: &str) -> Self {
        Self::new(name, "")
    }

    pub fn with_path(mut self, path: &str) -> Self {
        self.path = Some(path.to_string());
        self
    }

    pub fn with_domain(mut self, domain: &str) -> Self {
        self.domain = Some(domain.to_lowercase());
        self
    }

    pub fn secure(mut self) -> Self {
        self.secure = true;
        self
    }

    pub fn http_only(mut self) -> Self {
        self.http_only = true;
        self
    }

    pub fn expires_at(mut self, at: DateTime<Utc>) -> Self {
        self.expiry = Expiry::At(at);
        self
    }

    pub fn expires_in(self, lifetime: Duration) -> Self {
        self.expires_at(Utc::now() + lifetime)
    }

    /// Expect the cookie to be removed, whatever expiry it was issued with
    pub fn deleted(mut self) -> Self {
        self.expiry = Expiry::Delete;
        self
    }
}
