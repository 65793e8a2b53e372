//! Setup coordinator behavior: validity fast-path, re-login, teardown.

use std::fs;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tempfile::TempDir;

use crmv_auth::testing::{FakePage, FakeProvider};
use crmv_auth::{AuthError, Credentials, SetupConfig, SetupCoordinator, SetupOutcome, Target};
use crmv_protocol::{Cookie, StorageState};

const LANDING_URL: &str = "https://sandbox.example.com/app/home";

fn config(dir: &TempDir) -> SetupConfig {
    SetupConfig {
        credentials: Some(Credentials::new("qa@example.com", "pw")),
        login_url: "https://sandbox.example.com/login".into(),
        landing_url_pattern: "app/home".into(),
        session_file: dir.path().join(".auth").join("user.json"),
        login_timeout: Duration::from_millis(500),
        verification_timeout: Duration::from_millis(500),
        ..SetupConfig::default()
    }
}

/// Provider whose page completes the whole login successfully.
fn working_provider(config: &SetupConfig) -> FakeProvider {
    let page = FakePage::new();
    page.add_login_form(&config.labels);
    page.set_url_on_click(Target::button(&config.labels.submit), LANDING_URL);
    FakeProvider::new(page)
}

fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs_f64()
}

fn write_session(config: &SetupConfig, cookies: Vec<Cookie>) {
    let store = crmv_auth::SessionStore::new(&config.session_file);
    store.save(&StorageState::with_cookies(cookies)).unwrap();
}

#[tokio::test]
async fn valid_session_never_launches_a_browser() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);
    write_session(
        &config,
        vec![Cookie::new("sid", "v", ".example.com").expires(now_secs() + 200_000.0)],
    );

    let provider = working_provider(&config);
    let outcome = SetupCoordinator::new(config).run(&provider).await.unwrap();

    assert_eq!(outcome, SetupOutcome::Reused { long_lived: 1 });
    assert_eq!(provider.launches(), 0);
}

#[tokio::test]
async fn missing_session_triggers_login_and_persists() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);
    let provider = working_provider(&config);
    let coordinator = SetupCoordinator::new(config);

    let outcome = coordinator.run(&provider).await.unwrap();

    assert!(matches!(outcome, SetupOutcome::Refreshed { cookies } if cookies > 0));
    assert_eq!(provider.launches(), 1);
    assert_eq!(provider.closes(), 1);

    let saved = coordinator.store().load().unwrap();
    assert!(!saved.cookies.is_empty());
}

#[tokio::test]
async fn short_lived_session_triggers_relogin() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);
    write_session(
        &config,
        vec![Cookie::new("sid", "v", ".example.com").expires(now_secs() + 10.0)],
    );

    let provider = working_provider(&config);
    let outcome = SetupCoordinator::new(config).run(&provider).await.unwrap();

    assert!(matches!(outcome, SetupOutcome::Refreshed { .. }));
    assert_eq!(provider.launches(), 1);
}

#[tokio::test]
async fn corrupted_session_is_absorbed_into_relogin() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);
    fs::create_dir_all(config.session_file.parent().unwrap()).unwrap();
    fs::write(&config.session_file, "{\"cookies\": [").unwrap();

    let provider = working_provider(&config);
    let outcome = SetupCoordinator::new(config).run(&provider).await.unwrap();

    assert!(matches!(outcome, SetupOutcome::Refreshed { .. }));
}

#[tokio::test]
async fn login_failure_still_closes_the_browser_once() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);
    // Page without any controls: form fill fails mid-flow.
    let provider = FakeProvider::new(FakePage::new());

    let err = SetupCoordinator::new(config)
        .run(&provider)
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::Form { .. }));
    assert_eq!(provider.launches(), 1);
    assert_eq!(provider.closes(), 1);
}

#[tokio::test]
async fn launch_failure_is_fatal() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);
    let provider = working_provider(&config);
    provider.fail_launch();

    let err = SetupCoordinator::new(config)
        .run(&provider)
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::Browser(_)));
    assert_eq!(provider.closes(), 0);
}

#[tokio::test]
async fn teardown_error_never_masks_a_successful_login() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);
    let provider = working_provider(&config);
    provider.fail_close();

    let outcome = SetupCoordinator::new(config).run(&provider).await.unwrap();

    assert!(matches!(outcome, SetupOutcome::Refreshed { .. }));
    assert_eq!(provider.closes(), 1);
}

#[tokio::test]
async fn unwritable_session_directory_is_a_resource_error() {
    let dir = TempDir::new().unwrap();
    // A file where the session directory should be.
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "").unwrap();

    let mut config = config(&dir);
    config.session_file = blocker.join("user.json");

    let provider = working_provider(&config);
    let err = SetupCoordinator::new(config)
        .run(&provider)
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::Resource { .. }));
    assert_eq!(provider.launches(), 0);
}

#[tokio::test]
async fn rerun_after_refresh_reuses_without_browser() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);
    let provider = working_provider(&config);
    let coordinator = SetupCoordinator::new(config);

    let first = coordinator.run(&provider).await.unwrap();
    assert!(matches!(first, SetupOutcome::Refreshed { .. }));

    let second = coordinator.run(&provider).await.unwrap();
    assert!(matches!(second, SetupOutcome::Reused { .. }));
    assert_eq!(provider.launches(), 1, "second run must not launch again");
}
