//! Chromium executable discovery.

use std::path::PathBuf;

/// Locates a Chromium/Chrome executable.
///
/// `CRMV_BROWSER_PATH` takes precedence; otherwise well-known binary names
/// are resolved on `PATH`, then (on macOS) the standard app-bundle paths.
pub fn find_chromium_executable() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os("CRMV_BROWSER_PATH") {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    const CANDIDATES: &[&str] = &[
        "chromium",
        "chromium-browser",
        "google-chrome",
        "google-chrome-stable",
        "chrome",
    ];

    for candidate in CANDIDATES {
        if let Ok(path) = which::which(candidate) {
            return Some(path);
        }
    }

    #[cfg(target_os = "macos")]
    {
        const APP_PATHS: &[&str] = &[
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
        ];
        for path in APP_PATHS {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }
    }

    None
}
