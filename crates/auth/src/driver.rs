//! Browser seam for the login flow.
//!
//! The browser engine is an external collaborator: the orchestrator and
//! coordinator only speak these traits. The production implementation lives
//! in `crmv-engine`; deterministic fakes live in [`crate::testing`].

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crmv_protocol::StorageState;

/// Errors surfaced by a browser driver.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("navigation failed: {url}")]
    Navigation {
        url: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("element not found: {target}")]
    ElementNotFound { target: String },

    #[error("timeout after {ms}ms waiting for: {condition}")]
    Timeout { ms: u64, condition: String },

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Accessible role of a login control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Textbox,
    Button,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Textbox => "textbox",
            Role::Button => "button",
        }
    }
}

/// A page element addressed by accessible role and label text, the way the
/// login form is traversed (`textbox "Username"`, `button "Log In"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    pub role: Role,
    pub name: String,
}

impl Target {
    pub fn textbox(name: impl Into<String>) -> Self {
        Self {
            role: Role::Textbox,
            name: name.into(),
        }
    }

    pub fn button(name: impl Into<String>) -> Self {
        Self {
            role: Role::Button,
            name: name.into(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} \"{}\"", self.role.as_str(), self.name)
    }
}

/// Operations the login orchestrator performs against a live page.
///
/// Every operation that can block takes an explicit upper bound; there is no
/// unbounded wait anywhere behind this trait.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Current page URL.
    async fn url(&self) -> DriverResult<String>;

    /// Navigates to `url` and waits for the document to load, bounded by
    /// `timeout`.
    async fn goto(&self, url: &str, timeout: Duration) -> DriverResult<()>;

    /// Fills `value` into the control addressed by `target`, waiting up to
    /// `timeout` for it to appear.
    async fn fill(&self, target: &Target, value: &str, timeout: Duration) -> DriverResult<()>;

    /// Clicks the control addressed by `target`, waiting up to `timeout` for
    /// it to appear.
    async fn click(&self, target: &Target, timeout: Duration) -> DriverResult<()>;

    /// Single non-waiting presence probe. [`crate::wait::wait_present`] turns
    /// this into a bounded best-effort wait.
    async fn is_present(&self, target: &Target) -> DriverResult<bool>;

    /// Captures the context's cookies and per-origin storage.
    async fn storage_state(&self) -> DriverResult<StorageState>;
}

/// A live browser plus one page, released exactly once via `close`.
#[async_trait]
pub trait BrowserSession: Send {
    fn page(&self) -> &dyn PageDriver;

    /// Releases the browser. Consuming `self` makes double-release a type
    /// error rather than a runtime bug.
    async fn close(self: Box<Self>) -> DriverResult<()>;
}

/// Launches browser sessions for the setup coordinator.
#[async_trait]
pub trait BrowserProvider: Send + Sync {
    async fn launch(&self) -> DriverResult<Box<dyn BrowserSession>>;
}
