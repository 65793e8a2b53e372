//! Setup configuration.
//!
//! Every component receives an explicit [`SetupConfig`] at construction;
//! nothing below this module reads the process environment. [`SetupConfig::
//! from_env`] overlays `CRMV_*` variables onto the defaults for the CLI, and
//! tests substitute values directly.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Login credentials. The password never appears in `Debug` output or logs.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    /// Multi-factor code. Presence selects the automatic verification path;
    /// absence means an operator completes verification in the browser.
    pub verification_code: Option<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            verification_code: None,
        }
    }

    pub fn with_verification_code(mut self, code: impl Into<String>) -> Self {
        self.verification_code = Some(code.into());
        self
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("verification_code", &self.verification_code.is_some())
            .finish()
    }
}

/// Accessible labels of the login form controls.
#[derive(Debug, Clone)]
pub struct FormLabels {
    pub username: String,
    pub password: String,
    pub submit: String,
    pub verification_code: String,
    pub verify: String,
}

impl Default for FormLabels {
    fn default() -> Self {
        Self {
            username: "Username".into(),
            password: "Password".into(),
            submit: "Log In".into(),
            verification_code: "Verification Code".into(),
            verify: "Verify".into(),
        }
    }
}

/// Configuration for the session-setup phase.
#[derive(Debug, Clone)]
pub struct SetupConfig {
    /// Absent credentials only fail once a login is actually attempted; a
    /// valid stored session never needs them.
    pub credentials: Option<Credentials>,
    pub login_url: String,
    /// Regex matched against the page URL to detect the post-login landing
    /// page.
    pub landing_url_pattern: String,
    pub labels: FormLabels,
    pub session_file: PathBuf,
    pub login_timeout: Duration,
    pub verification_timeout: Duration,
    /// Cookies expiring within this window do not count as authentication
    /// evidence. The 1-day default is tuned to the identity provider's
    /// issuance pattern and deliberately overridable.
    pub long_lived_threshold: Duration,
    /// Mirrors the `CI` environment flag for the downstream test runner,
    /// which forbids execution filters when set.
    pub ci: bool,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            credentials: None,
            login_url: "https://sandbox.login.example-crm.com/".into(),
            landing_url_pattern: r"lightning/page/home".into(),
            labels: FormLabels::default(),
            session_file: PathBuf::from(".auth/user.json"),
            login_timeout: Duration::from_secs(60),
            verification_timeout: Duration::from_secs(120),
            long_lived_threshold: Duration::from_secs(86_400),
            ci: false,
        }
    }
}

impl SetupConfig {
    /// Defaults overlaid with `CRMV_*` environment variables.
    ///
    /// Recognized: `CRMV_USERNAME`, `CRMV_PASSWORD`, `CRMV_VERIFICATION_CODE`,
    /// `CRMV_LOGIN_URL`, `CRMV_LANDING_URL_PATTERN`, `CRMV_SESSION_FILE`,
    /// `CRMV_LOGIN_TIMEOUT_SECS`, `CRMV_VERIFICATION_TIMEOUT_SECS`, plus the
    /// conventional `CI` flag.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let (Some(username), Some(password)) = (var("CRMV_USERNAME"), var("CRMV_PASSWORD")) {
            let mut credentials = Credentials::new(username, password);
            credentials.verification_code = var("CRMV_VERIFICATION_CODE");
            config.credentials = Some(credentials);
        }

        if let Some(url) = var("CRMV_LOGIN_URL") {
            config.login_url = url;
        }
        if let Some(pattern) = var("CRMV_LANDING_URL_PATTERN") {
            config.landing_url_pattern = pattern;
        }
        if let Some(path) = var("CRMV_SESSION_FILE") {
            config.session_file = PathBuf::from(path);
        }
        if let Some(secs) = var("CRMV_LOGIN_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            config.login_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = var("CRMV_VERIFICATION_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            config.verification_timeout = Duration::from_secs(secs);
        }
        config.ci = var("CI").is_some_and(|v| !v.is_empty() && v != "0" && v != "false");

        config
    }

    /// True when the automatic verification path is selected.
    pub fn has_verification_code(&self) -> bool {
        self.credentials
            .as_ref()
            .is_some_and(|c| c.verification_code.is_some())
    }
}

fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_mirror_suite_constants() {
        let config = SetupConfig::default();
        assert_eq!(config.session_file, PathBuf::from(".auth/user.json"));
        assert_eq!(config.login_timeout, Duration::from_secs(60));
        assert_eq!(config.verification_timeout, Duration::from_secs(120));
        assert_eq!(config.long_lived_threshold, Duration::from_secs(86_400));
        assert!(config.credentials.is_none());
        assert!(!config.has_verification_code());
    }

    #[test]
    fn debug_redacts_password() {
        let credentials =
            Credentials::new("qa@example.com", "hunter2").with_verification_code("123456");
        let rendered = format!("{credentials:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("123456"));
        assert!(rendered.contains("qa@example.com"));
    }
}
