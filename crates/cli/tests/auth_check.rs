//! Integration tests for the `auth` subcommands, run against the built
//! binary so exit codes match what CI scripting sees.

use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

use tempfile::TempDir;

/// Helper to get the crmv binary path
fn crmv_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // Remove test binary name
    path.pop(); // Remove deps
    path.push("crmv");
    path
}

fn run_crmv(args: &[&str]) -> (bool, String, String) {
    let output = Command::new(crmv_binary())
        .args(args)
        .output()
        .expect("Failed to execute crmv");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    (output.status.success(), stdout, stderr)
}

fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs_f64()
}

fn write_session(dir: &TempDir, cookies_json: &str) -> PathBuf {
    let path = dir.path().join("user.json");
    std::fs::write(
        &path,
        format!(r#"{{"cookies": {cookies_json}, "origins": []}}"#),
    )
    .unwrap();
    path
}

#[test]
fn check_passes_on_long_lived_session() {
    let dir = TempDir::new().unwrap();
    let path = write_session(
        &dir,
        &format!(
            r#"[{{"name": "sid", "value": "v", "expires": {}}}]"#,
            now_secs() + 200_000.0
        ),
    );

    let (success, stdout, _) = run_crmv(&[
        "--session-file",
        path.to_str().unwrap(),
        "auth",
        "check",
    ]);
    assert!(success, "expected exit 0 for a valid session");
    assert!(stdout.contains("valid session"));
}

#[test]
fn check_fails_on_missing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.json");

    let (success, stdout, _) = run_crmv(&[
        "--session-file",
        path.to_str().unwrap(),
        "auth",
        "check",
    ]);
    assert!(!success, "expected exit 1 for a missing session file");
    assert!(stdout.contains("does not exist"));
}

#[test]
fn check_fails_when_only_short_lived_cookies_remain() {
    let dir = TempDir::new().unwrap();
    let path = write_session(
        &dir,
        &format!(
            r#"[{{"name": "sid", "value": "v", "expires": {}}}]"#,
            now_secs() + 10.0
        ),
    );

    let (success, stdout, _) = run_crmv(&[
        "--session-file",
        path.to_str().unwrap(),
        "auth",
        "check",
    ]);
    assert!(!success);
    assert!(stdout.contains("long-lived"));
}

#[test]
fn check_fails_on_corrupted_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("user.json");
    std::fs::write(&path, "{\"cookies\": [").unwrap();

    let (success, stdout, _) = run_crmv(&[
        "--session-file",
        path.to_str().unwrap(),
        "auth",
        "check",
    ]);
    assert!(!success);
    assert!(stdout.contains("corrupted"));
}

#[test]
fn show_lists_cookies() {
    let dir = TempDir::new().unwrap();
    let path = write_session(
        &dir,
        r#"[{"name": "sid", "value": "v", "domain": ".example.com"}]"#,
    );

    let (success, stdout, _) = run_crmv(&[
        "--session-file",
        path.to_str().unwrap(),
        "auth",
        "show",
    ]);
    assert!(success);
    assert!(stdout.contains("COOKIES (1)"));
    assert!(stdout.contains("sid"));
    assert!(stdout.contains(".example.com"));
}

#[test]
fn show_fails_on_missing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.json");

    let (success, _, _) = run_crmv(&[
        "--session-file",
        path.to_str().unwrap(),
        "auth",
        "show",
    ]);
    assert!(!success);
}
