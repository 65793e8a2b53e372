//! Offline freshness decision for a stored session snapshot.
//!
//! Fail-closed: every I/O or parse problem becomes an invalid verdict, never
//! an error. Ambiguous or short-lived cookie evidence does not count as
//! "still authenticated" — a session about to expire mid-suite is worth one
//! re-login up front.

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::debug;

use crmv_protocol::StorageState;

/// Why a stored session is (un)usable. The reason is surfaced to the
/// operator before re-authenticating, to make flaky environments debuggable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Usable: at least one long-lived authentication cookie.
    Valid { long_lived: usize },
    /// The session file does not exist.
    Missing,
    /// The file exists but is empty (or a bare `{}` / `[]` document).
    Empty,
    /// The file is unreadable or not valid storage-state JSON. This is where
    /// the store's parse failure is absorbed into a re-login decision.
    Corrupted,
    /// Parsed fine but carries no cookies at all.
    NoCookies,
    /// Only short-lived tracking/session cookies remain.
    NoLongLivedCookies,
}

impl Verdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verdict::Valid { .. })
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Valid { long_lived } => {
                write!(f, "valid session ({long_lived} long-lived auth cookies)")
            }
            Verdict::Missing => write!(f, "session file does not exist"),
            Verdict::Empty => write!(f, "session file is empty"),
            Verdict::Corrupted => write!(f, "session file is corrupted"),
            Verdict::NoCookies => write!(f, "session file has no cookies"),
            Verdict::NoLongLivedCookies => {
                write!(f, "no long-lived authentication cookies found")
            }
        }
    }
}

/// Decides, without network access, whether the snapshot at `path` is still
/// usable. Never fails.
pub fn check(path: &Path, threshold: Duration) -> Verdict {
    check_at(path, now_secs(), threshold)
}

/// [`check`] against an explicit clock, for deterministic tests.
pub fn check_at(path: &Path, now_secs: f64, threshold: Duration) -> Verdict {
    let verdict = classify(path, now_secs, threshold.as_secs_f64());
    debug!(target = "crmv", path = %path.display(), %verdict, "validity check");
    verdict
}

fn classify(path: &Path, now_secs: f64, threshold_secs: f64) -> Verdict {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return Verdict::Missing,
        Err(_) => return Verdict::Corrupted,
    };

    let trimmed = content.trim();
    if trimmed.is_empty() || trimmed == "{}" || trimmed == "[]" {
        return Verdict::Empty;
    }

    let state: StorageState = match serde_json::from_str(trimmed) {
        Ok(state) => state,
        Err(_) => return Verdict::Corrupted,
    };

    if state.cookies.is_empty() {
        return Verdict::NoCookies;
    }

    let long_lived = state
        .cookies
        .iter()
        .filter(|cookie| cookie.is_long_lived(now_secs, threshold_secs))
        .count();

    if long_lived == 0 {
        Verdict::NoLongLivedCookies
    } else {
        Verdict::Valid { long_lived }
    }
}

fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const DAY: Duration = Duration::from_secs(86_400);
    const NOW: f64 = 1_700_000_000.0;

    fn check_content(content: &str) -> Verdict {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("user.json");
        fs::write(&path, content).unwrap();
        check_at(&path, NOW, DAY)
    }

    #[test]
    fn missing_file_is_invalid() {
        let dir = TempDir::new().unwrap();
        let verdict = check_at(&dir.path().join("absent.json"), NOW, DAY);
        assert_eq!(verdict, Verdict::Missing);
        assert!(!verdict.is_valid());
    }

    #[test]
    fn empty_and_bare_documents_are_invalid() {
        assert_eq!(check_content(""), Verdict::Empty);
        assert_eq!(check_content("   \n"), Verdict::Empty);
        assert_eq!(check_content("{}"), Verdict::Empty);
        assert_eq!(check_content("[]"), Verdict::Empty);
    }

    #[test]
    fn corrupted_json_is_invalid() {
        assert_eq!(check_content("{\"cookies\": ["), Verdict::Corrupted);
        assert_eq!(check_content("not json at all"), Verdict::Corrupted);
    }

    #[test]
    fn cookieless_state_is_invalid() {
        assert_eq!(
            check_content(r#"{"cookies": [], "origins": [{"origin": "https://x", "localStorage": []}]}"#),
            Verdict::NoCookies
        );
    }

    #[test]
    fn short_lived_cookies_only_is_invalid() {
        let content = format!(
            r#"{{"cookies": [{{"name": "sid", "value": "v", "expires": {}}}], "origins": []}}"#,
            NOW + 10.0
        );
        assert_eq!(check_content(&content), Verdict::NoLongLivedCookies);
    }

    #[test]
    fn every_cookie_within_one_day_is_invalid() {
        let content = format!(
            r#"{{"cookies": [
                {{"name": "a", "value": "v", "expires": {}}},
                {{"name": "b", "value": "v", "expires": {}}},
                {{"name": "c", "value": "v"}}
            ], "origins": []}}"#,
            NOW + 3_600.0,
            NOW + 86_400.0
        );
        assert_eq!(check_content(&content), Verdict::NoLongLivedCookies);
    }

    #[test]
    fn one_long_lived_cookie_is_valid() {
        let content = format!(
            r#"{{"cookies": [
                {{"name": "tracking", "value": "v", "expires": {}}},
                {{"name": "sid", "value": "v", "expires": {}}}
            ], "origins": []}}"#,
            NOW + 10.0,
            NOW + 200_000.0
        );
        assert_eq!(check_content(&content), Verdict::Valid { long_lived: 1 });
    }

    #[test]
    fn threshold_is_configurable() {
        let content = format!(
            r#"{{"cookies": [{{"name": "sid", "value": "v", "expires": {}}}], "origins": []}}"#,
            NOW + 7_200.0
        );
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("user.json");
        fs::write(&path, content).unwrap();

        assert_eq!(check_at(&path, NOW, DAY), Verdict::NoLongLivedCookies);
        assert_eq!(
            check_at(&path, NOW, Duration::from_secs(3_600)),
            Verdict::Valid { long_lived: 1 }
        );
    }

    #[test]
    fn negative_expiry_is_session_cookie() {
        let content = r#"{"cookies": [{"name": "sid", "value": "v", "expires": -1}], "origins": []}"#;
        assert_eq!(check_content(content), Verdict::NoLongLivedCookies);
    }
}
