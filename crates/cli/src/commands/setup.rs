use std::io::ErrorKind;

use anyhow::Result;
use tracing::info;

use crmv_auth::{SetupConfig, SetupCoordinator, SetupOutcome};
use crmv_engine::ChromiumProvider;

pub async fn execute(config: SetupConfig, headed: bool, force: bool) -> Result<()> {
    if force {
        match std::fs::remove_file(&config.session_file) {
            Ok(()) => info!(target = "crmv", "stored session discarded"),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
    }

    // Manual verification needs a window the operator can type into.
    let manual = !config.has_verification_code();
    let provider = ChromiumProvider::new().headless(!(headed || manual));

    let coordinator = SetupCoordinator::new(config);
    match coordinator.run(&provider).await? {
        SetupOutcome::Reused { long_lived } => {
            println!("Session still valid ({long_lived} long-lived auth cookies); no login needed.");
        }
        SetupOutcome::Refreshed { cookies } => {
            println!(
                "Authentication state saved to: {}",
                coordinator.store().path().display()
            );
            println!("  Cookies: {cookies}");
        }
    }

    Ok(())
}
