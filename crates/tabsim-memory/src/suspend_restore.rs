//! Suspend/restore latency model.
//!
//! Keeps the latency formulas and the optional wall-clock wait in one
//! place so the reclamation loop and the driver never duplicate them.

use std::thread;
use std::time::Duration;
use tabsim_tabs::Tab;
use tracing::debug;

/// Fixed cost of writing out a snapshot
const SNAPSHOT_WRITE_BASE: Duration = Duration::from_millis(20);

/// Stateless helper wrapping a tab's suspend and restore transitions.
#[derive(Debug, Clone, Copy, Default)]
pub struct SuspendRestoreCoordinator;

impl SuspendRestoreCoordinator {
    /// Suspend `tab` and return the simulated snapshot write latency.
    ///
    /// The snapshot is taken before the state transition so its size is
    /// known up front. With `simulate_wait` the caller is blocked for the
    /// latency. A tab that is already suspended is left untouched.
    pub fn suspend_tab(tab: &mut Tab, save_snapshot: bool, simulate_wait: bool) -> Duration {
        if tab.is_suspended() {
            return Duration::ZERO;
        }

        let snapshot_size_mb = if save_snapshot { tab.create_snapshot() } else { 0 };
        let latency = SNAPSHOT_WRITE_BASE + Duration::from_millis(snapshot_size_mb);
        tab.suspend(false);

        debug!(
            tab_id = %tab.id(),
            snapshot_size_mb,
            latency_ms = latency.as_millis() as u64,
            "Tab suspended"
        );

        if simulate_wait {
            thread::sleep(latency);
        }
        latency
    }

    /// Restore `tab` and return the simulated restore latency.
    pub fn restore_tab(tab: &mut Tab, use_snapshot: bool, simulate_wait: bool) -> Duration {
        let latency = tab.restore(use_snapshot);
        if simulate_wait && !latency.is_zero() {
            thread::sleep(latency);
        }
        latency
    }
}
