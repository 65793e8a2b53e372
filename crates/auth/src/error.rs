use std::path::PathBuf;

use thiserror::Error;

use crate::driver::DriverError;
use crate::store::StoreError;

pub type Result<T> = std::result::Result<T, AuthError>;

/// Fatal failures of the session-setup phase.
///
/// Everything here aborts the run: no test worker may start without a
/// validated session. Recoverable conditions (a stale or corrupted session
/// file) never become an `AuthError` — they are absorbed by the validity
/// checker and turn into a re-login.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("credentials not configured (set CRMV_USERNAME and CRMV_PASSWORD)")]
    MissingCredentials,

    #[error("invalid landing URL pattern: {pattern}")]
    LandingPattern {
        pattern: String,
        #[source]
        source: regex_lite::Error,
    },

    #[error("browser session unavailable")]
    Browser(#[source] DriverError),

    #[error("login navigation failed: {url}")]
    Navigation {
        url: String,
        #[source]
        source: DriverError,
    },

    #[error("login form interaction failed: {control}")]
    Form {
        control: String,
        #[source]
        source: DriverError,
    },

    #[error("verification step failed")]
    Verification(#[source] DriverError),

    #[error("landing page {pattern} not reached within {ms}ms")]
    LandingTimeout { pattern: String, ms: u64 },

    #[error("session capture failed after login")]
    Capture(#[source] DriverError),

    #[error("session directory could not be prepared: {path}")]
    Resource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}
