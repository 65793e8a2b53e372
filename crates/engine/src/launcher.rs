//! Browser process launch.

use std::fs;
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use tracing::{debug, warn};

use crmv_auth::{DriverError, driver::DriverResult};

use crate::probe::fetch_cdp_endpoint;

const PROBE_ATTEMPTS: u32 = 40;
const PROBE_INTERVAL: Duration = Duration::from_millis(250);

/// A running browser process with an open debugging endpoint.
pub struct LaunchedBrowser {
    child: Child,
    profile_dir: PathBuf,
    pub ws_url: String,
}

impl LaunchedBrowser {
    /// Kills the process and removes the throwaway profile. Best-effort;
    /// the process group dies with the child.
    pub fn shutdown(mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        if let Err(err) = fs::remove_dir_all(&self.profile_dir) {
            warn!(
                target = "crmv.engine",
                dir = %self.profile_dir.display(),
                error = %err,
                "failed to remove browser profile"
            );
        }
    }
}

/// Launches `executable` with a remote-debugging port on a throwaway
/// profile and waits for the endpoint to come up.
pub async fn launch(executable: &Path, headless: bool) -> DriverResult<LaunchedBrowser> {
    let port = pick_port()?;
    let profile_dir =
        std::env::temp_dir().join(format!("crmv-profile-{}-{port}", std::process::id()));
    fs::create_dir_all(&profile_dir)?;

    let args = chromium_args(port, &profile_dir, headless);
    debug!(target = "crmv.engine", exe = %executable.display(), port, headless, "launching browser");

    let mut child = Command::new(executable)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| {
            DriverError::Launch(format!("failed to launch {}: {e}", executable.display()))
        })?;

    let mut last_error = "endpoint not reachable".to_string();
    for _ in 0..PROBE_ATTEMPTS {
        tokio::time::sleep(PROBE_INTERVAL).await;

        if let Ok(Some(status)) = child.try_wait() {
            let _ = fs::remove_dir_all(&profile_dir);
            return Err(DriverError::Launch(format!(
                "browser exited before the debugging endpoint became available (status: {status})"
            )));
        }

        match fetch_cdp_endpoint(port).await {
            Ok(info) => {
                debug!(
                    target = "crmv.engine",
                    browser = info.browser.as_deref().unwrap_or("unknown"),
                    port,
                    "debugging endpoint ready"
                );
                return Ok(LaunchedBrowser {
                    child,
                    profile_dir,
                    ws_url: info.web_socket_debugger_url,
                });
            }
            Err(e) => last_error = e.to_string(),
        }
    }

    let _ = child.kill();
    let _ = child.wait();
    let _ = fs::remove_dir_all(&profile_dir);
    Err(DriverError::Launch(format!(
        "debugging endpoint not available on port {port}: {last_error}"
    )))
}

/// Asks the OS for a free port. Raceable in principle; the launch probe loop
/// reports a clear error if the port is taken in between.
fn pick_port() -> DriverResult<u16> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

pub(crate) fn chromium_args(port: u16, profile_dir: &Path, headless: bool) -> Vec<String> {
    let mut args = vec![
        format!("--remote-debugging-port={port}"),
        format!("--user-data-dir={}", profile_dir.display()),
        "--no-first-run".to_string(),
        "--no-default-browser-check".to_string(),
    ];

    if headless {
        args.push("--headless=new".to_string());
        args.push("--disable-gpu".to_string());
    }

    args.push("about:blank".to_string());
    args
}
