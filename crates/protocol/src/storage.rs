//! Cookie and storage state types for session snapshots.
//!
//! These types represent the browser cookies and per-origin localStorage
//! captured after login and restored into test worker contexts.

use serde::{Deserialize, Serialize};

/// SameSite cookie attribute.
///
/// Controls when cookies are sent with cross-site requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SameSite {
    /// Cookie is sent with same-site and cross-site requests
    #[serde(rename = "None")]
    None,
    /// Cookie is sent with same-site requests and cross-site top-level navigations
    #[default]
    #[serde(rename = "Lax")]
    Lax,
    /// Cookie is only sent with same-site requests
    #[serde(rename = "Strict")]
    Strict,
}

/// A browser cookie.
///
/// All fields default so that partially-populated cookie objects in older or
/// hand-edited session files still deserialize; freshness decisions only
/// depend on `expires`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Cookie {
    /// Cookie name
    pub name: String,

    /// Cookie value
    pub value: String,

    /// Domain for the cookie
    pub domain: String,

    /// Path for the cookie
    pub path: String,

    /// Unix timestamp in seconds (-1 or absent means session cookie)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires: Option<f64>,

    /// Whether the cookie is HTTP-only
    pub http_only: bool,

    /// Whether the cookie requires HTTPS
    pub secure: bool,

    /// SameSite attribute
    pub same_site: SameSite,
}

impl Cookie {
    /// Creates a new cookie with required fields.
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            path: "/".to_string(),
            ..Self::default()
        }
    }

    /// Sets the expiration timestamp.
    pub fn expires(mut self, expires: f64) -> Self {
        self.expires = Some(expires);
        self
    }

    /// Sets whether the cookie is HTTP-only.
    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    /// Sets whether the cookie requires HTTPS.
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Sets the SameSite attribute.
    pub fn same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = same_site;
        self
    }

    /// True when this cookie counts as durable authentication material:
    /// an absolute expiry more than `threshold_secs` past `now_secs`.
    ///
    /// Session cookies (absent or non-positive `expires`) and anything
    /// expiring inside the threshold are treated as short-lived tracking
    /// noise, not proof of a usable login.
    pub fn is_long_lived(&self, now_secs: f64, threshold_secs: f64) -> bool {
        match self.expires {
            Some(expires) if expires > 0.0 => expires > now_secs + threshold_secs,
            _ => false,
        }
    }
}

/// A localStorage entry within an origin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalStorageEntry {
    /// Storage key
    pub name: String,
    /// Storage value
    pub value: String,
}

/// Storage state for a single origin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OriginState {
    /// The origin URL
    pub origin: String,
    /// localStorage entries for this origin
    pub local_storage: Vec<LocalStorageEntry>,
}

/// Complete browser storage state.
///
/// Written once by the setup coordinator after a successful login and read by
/// every test worker seeding an isolated browser context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageState {
    /// All cookies in the browser context
    pub cookies: Vec<Cookie>,
    /// localStorage data per origin
    pub origins: Vec<OriginState>,
}

impl StorageState {
    /// Creates an empty storage state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a storage state with cookies only.
    pub fn with_cookies(cookies: Vec<Cookie>) -> Self {
        Self {
            cookies,
            origins: Vec::new(),
        }
    }
}
