//! Testing infrastructure for the session lifecycle.
//!
//! Scripted fakes for the browser seam, so the login orchestrator and setup
//! coordinator can be exercised deterministically without a browser.
//! Configure page behavior with the `add_*`/`set_*`/`fail_*` methods, run the
//! code under test, then assert on the recorded [`FakeAction`] sequence.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crmv_protocol::{Cookie, StorageState};

use crate::config::FormLabels;
use crate::driver::{
    BrowserProvider, BrowserSession, DriverError, DriverResult, PageDriver, Target,
};

/// Action recorded by [`FakePage`] for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeAction {
    Goto { url: String },
    Fill { target: String, value: String },
    Click { target: String },
}

/// Scripted page driver.
///
/// Controls are absent until added; filling or clicking a missing control
/// fails the way a real page would. A click can be scripted to change the
/// page URL, which is how tests simulate the post-login redirect.
#[derive(Default)]
pub struct FakePage {
    url: Mutex<String>,
    controls: Mutex<HashSet<Target>>,
    url_on_click: Mutex<HashMap<Target, String>>,
    actions: Mutex<Vec<FakeAction>>,
    storage: Mutex<StorageState>,
    fail_goto: AtomicBool,
    fail_probes: AtomicBool,
    fail_storage: AtomicBool,
}

impl FakePage {
    pub fn new() -> Self {
        Self {
            url: Mutex::new("about:blank".to_string()),
            storage: Mutex::new(StorageState::with_cookies(vec![
                Cookie::new("sid", "fake-session", ".example.com").expires(4_000_000_000.0),
            ])),
            ..Self::default()
        }
    }

    /// Makes `target` present on the page.
    pub fn add_control(&self, target: Target) {
        self.controls.lock().unwrap().insert(target);
    }

    /// Adds the username/password textboxes and the submit button.
    pub fn add_login_form(&self, labels: &FormLabels) {
        self.add_control(Target::textbox(&labels.username));
        self.add_control(Target::textbox(&labels.password));
        self.add_control(Target::button(&labels.submit));
    }

    /// Adds the verification-code textbox and the verify button.
    pub fn add_verification_prompt(&self, labels: &FormLabels) {
        self.add_control(Target::textbox(&labels.verification_code));
        self.add_control(Target::button(&labels.verify));
    }

    pub fn set_url(&self, url: &str) {
        *self.url.lock().unwrap() = url.to_string();
    }

    /// Scripts a URL change when `target` is clicked (post-login redirect).
    pub fn set_url_on_click(&self, target: Target, url: &str) {
        self.url_on_click
            .lock()
            .unwrap()
            .insert(target, url.to_string());
    }

    pub fn set_storage_state(&self, state: StorageState) {
        *self.storage.lock().unwrap() = state;
    }

    /// Makes navigation fail.
    pub fn fail_goto(&self) {
        self.fail_goto.store(true, Ordering::SeqCst);
    }

    /// Makes presence probes error instead of answering.
    pub fn fail_probes(&self) {
        self.fail_probes.store(true, Ordering::SeqCst);
    }

    /// Makes storage capture fail.
    pub fn fail_storage_state(&self) {
        self.fail_storage.store(true, Ordering::SeqCst);
    }

    /// Returns all recorded actions.
    pub fn actions(&self) -> Vec<FakeAction> {
        self.actions.lock().unwrap().clone()
    }

    fn record(&self, action: FakeAction) {
        self.actions.lock().unwrap().push(action);
    }

    fn has_control(&self, target: &Target) -> bool {
        self.controls.lock().unwrap().contains(target)
    }
}

#[async_trait]
impl PageDriver for FakePage {
    async fn url(&self) -> DriverResult<String> {
        Ok(self.url.lock().unwrap().clone())
    }

    async fn goto(&self, url: &str, _timeout: Duration) -> DriverResult<()> {
        if self.fail_goto.load(Ordering::SeqCst) {
            return Err(DriverError::Navigation {
                url: url.to_string(),
                source: anyhow::anyhow!("connection refused"),
            });
        }
        self.record(FakeAction::Goto {
            url: url.to_string(),
        });
        self.set_url(url);
        Ok(())
    }

    async fn fill(&self, target: &Target, value: &str, _timeout: Duration) -> DriverResult<()> {
        if !self.has_control(target) {
            return Err(DriverError::ElementNotFound {
                target: target.to_string(),
            });
        }
        self.record(FakeAction::Fill {
            target: target.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }

    async fn click(&self, target: &Target, _timeout: Duration) -> DriverResult<()> {
        if !self.has_control(target) {
            return Err(DriverError::ElementNotFound {
                target: target.to_string(),
            });
        }
        self.record(FakeAction::Click {
            target: target.to_string(),
        });
        if let Some(url) = self.url_on_click.lock().unwrap().get(target) {
            *self.url.lock().unwrap() = url.clone();
        }
        Ok(())
    }

    async fn is_present(&self, target: &Target) -> DriverResult<bool> {
        if self.fail_probes.load(Ordering::SeqCst) {
            return Err(DriverError::Protocol("probe failure".into()));
        }
        Ok(self.has_control(target))
    }

    async fn storage_state(&self) -> DriverResult<StorageState> {
        if self.fail_storage.load(Ordering::SeqCst) {
            return Err(DriverError::Protocol("storage capture failure".into()));
        }
        Ok(self.storage.lock().unwrap().clone())
    }
}

/// Session handed out by [`FakeProvider`]; counts closes on the shared
/// counter so tests can assert exactly-once teardown.
pub struct FakeSession {
    page: Arc<FakePage>,
    closes: Arc<AtomicUsize>,
    fail_close: bool,
}

#[async_trait]
impl BrowserSession for FakeSession {
    fn page(&self) -> &dyn PageDriver {
        self.page.as_ref()
    }

    async fn close(self: Box<Self>) -> DriverResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(DriverError::Protocol("close failure".into()));
        }
        Ok(())
    }
}

/// Browser provider over a shared [`FakePage`], counting launches and closes.
pub struct FakeProvider {
    page: Arc<FakePage>,
    launches: AtomicUsize,
    closes: Arc<AtomicUsize>,
    fail_launch: AtomicBool,
    fail_close: AtomicBool,
}

impl FakeProvider {
    pub fn new(page: FakePage) -> Self {
        Self {
            page: Arc::new(page),
            launches: AtomicUsize::new(0),
            closes: Arc::new(AtomicUsize::new(0)),
            fail_launch: AtomicBool::new(false),
            fail_close: AtomicBool::new(false),
        }
    }

    /// The shared page, for configuration and action assertions.
    pub fn page(&self) -> &FakePage {
        &self.page
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn fail_launch(&self) {
        self.fail_launch.store(true, Ordering::SeqCst);
    }

    pub fn fail_close(&self) {
        self.fail_close.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl BrowserProvider for FakeProvider {
    async fn launch(&self) -> DriverResult<Box<dyn BrowserSession>> {
        if self.fail_launch.load(Ordering::SeqCst) {
            return Err(DriverError::Launch("scripted launch failure".into()));
        }
        self.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            page: Arc::clone(&self.page),
            closes: Arc::clone(&self.closes),
            fail_close: self.fail_close.load(Ordering::SeqCst),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fake_page_records_actions() {
        let page = FakePage::new();
        let button = Target::button("Log In");
        page.add_control(button.clone());

        page.goto("https://example.com", Duration::from_secs(1))
            .await
            .unwrap();
        page.click(&button, Duration::from_secs(1)).await.unwrap();

        assert_eq!(
            page.actions(),
            vec![
                FakeAction::Goto {
                    url: "https://example.com".into()
                },
                FakeAction::Click {
                    target: "button \"Log In\"".into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn missing_control_fails_fill() {
        let page = FakePage::new();
        let err = page
            .fill(&Target::textbox("Username"), "x", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::ElementNotFound { .. }));
    }

    #[tokio::test]
    async fn click_can_redirect() {
        let page = FakePage::new();
        let button = Target::button("Log In");
        page.add_control(button.clone());
        page.set_url_on_click(button.clone(), "https://example.com/home");

        page.click(&button, Duration::from_secs(1)).await.unwrap();
        assert_eq!(page.url().await.unwrap(), "https://example.com/home");
    }

    #[tokio::test]
    async fn provider_counts_launches_and_closes() {
        let provider = FakeProvider::new(FakePage::new());
        let session = provider.launch().await.unwrap();
        session.close().await.unwrap();

        assert_eq!(provider.launches(), 1);
        assert_eq!(provider.closes(), 1);
    }
}
