//! Setup coordination.
//!
//! Runs exactly once per invocation, before any parallel test worker: check
//! the stored session, re-authenticate only when needed, and guarantee the
//! browser is released on every exit path. Test workers never start without
//! a validated session — orchestrator failures propagate after teardown.

use tracing::{info, warn};

use crate::config::SetupConfig;
use crate::driver::{BrowserProvider, PageDriver};
use crate::error::{AuthError, Result};
use crate::login::LoginOrchestrator;
use crate::store::SessionStore;
use crate::validity::{self, Verdict};

/// What the coordinator did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupOutcome {
    /// Stored session was still usable; no browser was launched.
    Reused { long_lived: usize },
    /// A fresh login ran and its snapshot was persisted.
    Refreshed { cookies: usize },
}

/// Orchestrates validity check, login, and persistence.
pub struct SetupCoordinator {
    config: SetupConfig,
    store: SessionStore,
}

impl SetupCoordinator {
    pub fn new(config: SetupConfig) -> Self {
        let store = SessionStore::new(&config.session_file);
        Self { config, store }
    }

    pub fn config(&self) -> &SetupConfig {
        &self.config
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Runs the setup phase. Launches a browser only when the stored session
    /// is unusable; the session is closed exactly once on every exit path.
    pub async fn run(&self, provider: &dyn BrowserProvider) -> Result<SetupOutcome> {
        self.store
            .ensure_parent()
            .map_err(|source| AuthError::Resource {
                path: self.store.path().to_path_buf(),
                source,
            })?;

        let verdict = validity::check(self.store.path(), self.config.long_lived_threshold);
        if let Verdict::Valid { long_lived } = verdict {
            info!(target = "crmv", %verdict, "reusing stored session");
            return Ok(SetupOutcome::Reused { long_lived });
        }

        info!(target = "crmv", reason = %verdict, "stored session unusable; re-authenticating");

        let session = provider.launch().await.map_err(AuthError::Browser)?;
        let result = self.authenticate(session.page()).await;

        // Teardown runs on success and failure alike; a close error is
        // logged but never masks the login result.
        if let Err(err) = session.close().await {
            warn!(target = "crmv", error = %err, "browser teardown failed");
        }

        result
    }

    async fn authenticate(&self, page: &dyn PageDriver) -> Result<SetupOutcome> {
        let state = LoginOrchestrator::new(&self.config).login(page).await?;
        self.store.save(&state)?;
        info!(
            target = "crmv",
            path = %self.store.path().display(),
            cookies = state.cookies.len(),
            "session state persisted"
        );
        Ok(SetupOutcome::Refreshed {
            cookies: state.cookies.len(),
        })
    }
}
