//! Browser provider and session lifecycle.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, info};

use crmv_auth::driver::DriverResult;
use crmv_auth::{BrowserProvider, BrowserSession, DriverError, PageDriver};

use crate::cdp::CdpConnection;
use crate::finder::find_chromium_executable;
use crate::launcher::{self, LaunchedBrowser};
use crate::page::CdpPage;

const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Launches a dedicated Chromium instance per session.
pub struct ChromiumProvider {
    headless: bool,
    executable: Option<PathBuf>,
    call_timeout: Duration,
}

impl ChromiumProvider {
    pub fn new() -> Self {
        Self {
            headless: true,
            executable: None,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Headed mode, for manual verification in a visible window.
    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Explicit browser binary instead of discovery.
    pub fn executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }

    async fn attach(
        browser: &LaunchedBrowser,
        call_timeout: Duration,
    ) -> DriverResult<(Arc<CdpConnection>, CdpPage)> {
        let conn = Arc::new(CdpConnection::connect(&browser.ws_url, call_timeout).await?);

        let created = conn
            .call(None, "Target.createTarget", json!({ "url": "about:blank" }))
            .await?;
        let target_id = created
            .get("targetId")
            .and_then(Value::as_str)
            .ok_or_else(|| DriverError::Protocol("createTarget returned no targetId".into()))?
            .to_string();

        let attached = conn
            .call(
                None,
                "Target.attachToTarget",
                json!({ "targetId": target_id, "flatten": true }),
            )
            .await?;
        let session_id = attached
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| DriverError::Protocol("attachToTarget returned no sessionId".into()))?
            .to_string();

        let page = CdpPage::new(Arc::clone(&conn), session_id);
        Ok((conn, page))
    }
}

impl Default for ChromiumProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrowserProvider for ChromiumProvider {
    async fn launch(&self) -> DriverResult<Box<dyn BrowserSession>> {
        let executable = self
            .executable
            .clone()
            .or_else(find_chromium_executable)
            .ok_or_else(|| {
                DriverError::Launch(
                    "could not find a Chrome/Chromium executable; \
                     install one or set CRMV_BROWSER_PATH"
                        .into(),
                )
            })?;

        let browser = launcher::launch(&executable, self.headless).await?;
        info!(target = "crmv.engine", exe = %executable.display(), "browser ready");

        match Self::attach(&browser, self.call_timeout).await {
            Ok((conn, page)) => Ok(Box::new(EngineSession {
                page,
                conn,
                browser,
            })),
            Err(err) => {
                browser.shutdown();
                Err(err)
            }
        }
    }
}

/// One launched browser with one attached page.
pub struct EngineSession {
    page: CdpPage,
    conn: Arc<CdpConnection>,
    browser: LaunchedBrowser,
}

#[async_trait]
impl BrowserSession for EngineSession {
    fn page(&self) -> &dyn PageDriver {
        &self.page
    }

    async fn close(self: Box<Self>) -> DriverResult<()> {
        // Polite shutdown first; the connection often drops before the
        // response arrives, so the result is advisory.
        if let Err(err) = self.conn.call(None, "Browser.close", json!({})).await {
            debug!(target = "crmv.engine", error = %err, "Browser.close did not confirm");
        }
        self.browser.shutdown();
        Ok(())
    }
}
