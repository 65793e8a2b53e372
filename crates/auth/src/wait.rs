//! Best-effort bounded waits.

use std::time::Duration;

use tokio::time::Instant;

use crate::driver::{PageDriver, Target};

/// Poll cadence for presence and URL waits.
pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Waits up to `timeout` for `target` to be present, returning whether it
/// appeared. Driver errors count as "absent" — this primitive replaces the
/// scattered "try to find an optional element, ignore failures" pattern, so
/// it never raises.
pub async fn wait_present(page: &dyn PageDriver, target: &Target, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;

    loop {
        if page.is_present(target).await.unwrap_or(false) {
            return true;
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
    use crate::testing::FakePage;

    #[tokio::test]
    async fn present_target_is_found_immediately() {
        let page = FakePage::new();
        let target = Target::button("Verify");
        page.add_control(target.clone());

        assert!(wait_present(&page, &target, Duration::from_millis(50)).await);
    }

    #[tokio::test]
    async fn absent_target_times_out_to_false() {
        let page = FakePage::new();
        let target = Target::button("Verify");

        let start = std::time::Instant::now();
        assert!(!wait_present(&page, &target, Duration::from_millis(100)).await);
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn probe_errors_count_as_absent() {
        let page = FakePage::new();
        page.fail_probes();
        let target = Target::textbox("Verification Code");

        assert!(!wait_present(&page, &target, Duration::from_millis(50)).await);
    }
}
