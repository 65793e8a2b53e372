//! Login orchestration.
//!
//! A single pass over the identity provider's login flow: navigate, fill the
//! credential form, clear the verification challenge, wait for the landing
//! page, capture storage. No internal retries — the pass either produces a
//! fresh [`StorageState`] or fails the run.
//!
//! The flow is modeled as an explicit state machine with a pure transition
//! function, so a fake page driver can exercise every transition without a
//! real browser.

use std::time::Duration;

use regex_lite::Regex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crmv_protocol::StorageState;

use crate::config::SetupConfig;
use crate::driver::{PageDriver, Target};
use crate::error::{AuthError, Result};
use crate::wait::{POLL_INTERVAL, wait_present};

/// How long the automatic path waits for the verification prompt before
/// concluding the provider skipped the challenge (trusted device).
const CODE_PROMPT_WAIT: Duration = Duration::from_secs(10);

/// Steps of the login flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    NotStarted,
    /// Loading the login URL.
    Navigating,
    /// Credential form filled and submitted.
    FormFilled,
    /// Verification challenge in progress (automatic or manual).
    AwaitingVerification,
    /// Terminal: landing page reached.
    Authenticated,
    /// Terminal: an unrecoverable step error or timeout.
    Failed,
}

/// Observations that drive the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginEvent {
    Started,
    FormSubmitted,
    ChallengeStarted,
    LandingReached,
    NavigationFailed,
    ControlFailed,
    TimedOut,
}

impl LoginState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoginState::Authenticated | LoginState::Failed)
    }

    /// Pure transition function. Terminal states absorb every event; an
    /// event that does not apply to the current state leaves it unchanged.
    pub fn advance(self, event: LoginEvent) -> LoginState {
        use LoginEvent::*;
        use LoginState::*;

        if self.is_terminal() {
            return self;
        }

        match (self, event) {
            (NotStarted, Started) => Navigating,
            (Navigating, FormSubmitted) => FormFilled,
            (FormFilled, ChallengeStarted) => AwaitingVerification,
            (AwaitingVerification, LandingReached) => Authenticated,
            (_, NavigationFailed | ControlFailed | TimedOut) => Failed,
            (state, _) => state,
        }
    }
}

fn transition(state: &mut LoginState, event: LoginEvent) {
    let next = state.advance(event);
    debug!(target = "crmv", from = ?state, event = ?event, to = ?next, "login transition");
    *state = next;
}

/// Drives one login pass against a page.
pub struct LoginOrchestrator<'a> {
    config: &'a SetupConfig,
}

impl<'a> LoginOrchestrator<'a> {
    pub fn new(config: &'a SetupConfig) -> Self {
        Self { config }
    }

    /// Runs the full flow and returns the captured session snapshot.
    pub async fn login(&self, page: &dyn PageDriver) -> Result<StorageState> {
        let config = self.config;
        let credentials = config
            .credentials
            .as_ref()
            .ok_or(AuthError::MissingCredentials)?;

        let landing = Regex::new(&config.landing_url_pattern).map_err(|source| {
            AuthError::LandingPattern {
                pattern: config.landing_url_pattern.clone(),
                source,
            }
        })?;

        let mut state = LoginState::NotStarted;
        transition(&mut state, LoginEvent::Started);

        info!(target = "crmv", url = %config.login_url, "navigating to login page");
        if let Err(source) = page.goto(&config.login_url, config.login_timeout).await {
            transition(&mut state, LoginEvent::NavigationFailed);
            return Err(AuthError::Navigation {
                url: config.login_url.clone(),
                source,
            });
        }

        info!(target = "crmv", username = %credentials.username, "filling login form");
        let labels = &config.labels;
        self.fill(page, &mut state, Target::textbox(&labels.username), &credentials.username)
            .await?;
        self.fill(page, &mut state, Target::textbox(&labels.password), &credentials.password)
            .await?;
        self.click(page, &mut state, Target::button(&labels.submit))
            .await?;
        transition(&mut state, LoginEvent::FormSubmitted);

        transition(&mut state, LoginEvent::ChallengeStarted);
        let deadline = Instant::now() + config.verification_timeout;

        match credentials.verification_code.as_deref() {
            Some(code) => {
                self.submit_verification_code(page, &mut state, code, config.verification_timeout)
                    .await?;
            }
            None => {
                warn!(
                    target = "crmv",
                    "no verification code configured; complete verification in the browser window"
                );
                info!(
                    target = "crmv",
                    timeout_secs = config.verification_timeout.as_secs(),
                    "waiting for manual verification"
                );
            }
        }

        if !wait_for_landing(page, &landing, deadline).await {
            transition(&mut state, LoginEvent::TimedOut);
            return Err(AuthError::LandingTimeout {
                pattern: config.landing_url_pattern.clone(),
                ms: config.verification_timeout.as_millis() as u64,
            });
        }
        transition(&mut state, LoginEvent::LandingReached);
        info!(target = "crmv", "login successful");

        page.storage_state().await.map_err(AuthError::Capture)
    }

    /// Automatic path: the provider may skip the challenge for trusted
    /// devices, so the prompt is probed best-effort before filling.
    async fn submit_verification_code(
        &self,
        page: &dyn PageDriver,
        state: &mut LoginState,
        code: &str,
        verification_timeout: Duration,
    ) -> Result<()> {
        let labels = &self.config.labels;
        let code_box = Target::textbox(&labels.verification_code);
        let prompt_wait = CODE_PROMPT_WAIT.min(verification_timeout);

        if !wait_present(page, &code_box, prompt_wait).await {
            info!(
                target = "crmv",
                "verification prompt not shown; continuing to landing check"
            );
            return Ok(());
        }

        info!(target = "crmv", "submitting verification code");
        let result = async {
            page.fill(&code_box, code, self.config.login_timeout).await?;
            page.click(&Target::button(&labels.verify), self.config.login_timeout)
                .await
        }
        .await;

        if let Err(source) = result {
            transition(state, LoginEvent::ControlFailed);
            return Err(AuthError::Verification(source));
        }
        Ok(())
    }

    async fn fill(
        &self,
        page: &dyn PageDriver,
        state: &mut LoginState,
        target: Target,
        value: &str,
    ) -> Result<()> {
        if let Err(source) = page.fill(&target, value, self.config.login_timeout).await {
            transition(state, LoginEvent::ControlFailed);
            return Err(AuthError::Form {
                control: target.to_string(),
                source,
            });
        }
        Ok(())
    }

    async fn click(
        &self,
        page: &dyn PageDriver,
        state: &mut LoginState,
        target: Target,
    ) -> Result<()> {
        if let Err(source) = page.click(&target, self.config.login_timeout).await {
            transition(state, LoginEvent::ControlFailed);
            return Err(AuthError::Form {
                control: target.to_string(),
                source,
            });
        }
        Ok(())
    }
}

/// Polls the page URL against `landing` until it matches or `deadline`
/// passes. URL read errors keep polling — the bound is the deadline.
async fn wait_for_landing(page: &dyn PageDriver, landing: &Regex, deadline: Instant) -> bool {
    loop {
        if let Ok(url) = page.url().await {
            if landing.is_match(&url) {
                return true;
            }
        }

        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        tokio::time::sleep(POLL_INTERVAL.min(deadline - now)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions() {
        use LoginEvent::*;
        use LoginState::*;

        let mut state = NotStarted;
        for (event, expected) in [
            (Started, Navigating),
            (FormSubmitted, FormFilled),
            (ChallengeStarted, AwaitingVerification),
            (LandingReached, Authenticated),
        ] {
            state = state.advance(event);
            assert_eq!(state, expected);
        }
        assert!(state.is_terminal());
    }

    #[test]
    fn failures_are_terminal_from_any_active_state() {
        use LoginEvent::*;
        use LoginState::*;

        assert_eq!(Navigating.advance(NavigationFailed), Failed);
        assert_eq!(Navigating.advance(ControlFailed), Failed);
        assert_eq!(FormFilled.advance(ControlFailed), Failed);
        assert_eq!(AwaitingVerification.advance(TimedOut), Failed);
        assert_eq!(AwaitingVerification.advance(ControlFailed), Failed);
    }

    #[test]
    fn terminal_states_absorb_every_event() {
        use LoginEvent::*;
        use LoginState::*;

        for event in [
            Started,
            FormSubmitted,
            ChallengeStarted,
            LandingReached,
            NavigationFailed,
            ControlFailed,
            TimedOut,
        ] {
            assert_eq!(Authenticated.advance(event), Authenticated);
            assert_eq!(Failed.advance(event), Failed);
        }
    }

    #[test]
    fn inapplicable_events_leave_state_unchanged() {
        use LoginEvent::*;
        use LoginState::*;

        assert_eq!(NotStarted.advance(LandingReached), NotStarted);
        assert_eq!(Navigating.advance(ChallengeStarted), Navigating);
        assert_eq!(FormFilled.advance(Started), FormFilled);
    }
}
