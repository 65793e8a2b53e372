//! Authenticated-session lifecycle for CRM UI verification runs.
//!
//! Decides whether a previously captured login session is still usable and,
//! only when it is not, drives the multi-factor login flow exactly once —
//! before any test worker starts — so the whole parallel suite shares one
//! persisted session without re-authenticating or burning single-use
//! verification codes.
//!
//! Components, leaves first:
//! - [`store::SessionStore`] — atomic persistence of the session snapshot.
//! - [`validity`] — offline freshness verdict over the stored snapshot.
//! - [`login::LoginOrchestrator`] — one login pass, modeled as an explicit
//!   state machine over the [`driver::PageDriver`] seam.
//! - [`setup::SetupCoordinator`] — ties the above together with guaranteed
//!   browser teardown.
//!
//! The browser engine itself is an external collaborator behind the traits
//! in [`driver`]; `crmv-engine` provides the production implementation and
//! [`testing`] provides deterministic fakes.

pub mod config;
pub mod driver;
pub mod error;
pub mod login;
pub mod setup;
pub mod store;
pub mod testing;
pub mod validity;
pub mod wait;

pub use config::{Credentials, FormLabels, SetupConfig};
pub use driver::{
    BrowserProvider, BrowserSession, DriverError, DriverResult, PageDriver, Role, Target,
};
pub use error::{AuthError, Result};
pub use login::{LoginEvent, LoginOrchestrator, LoginState};
pub use setup::{SetupCoordinator, SetupOutcome};
pub use store::{SessionStore, StoreError};
pub use validity::Verdict;
pub use wait::wait_present;
