//! Tab state and memory model.

use crate::types::{ActivityIntensity, PageId, TabId};
use crate::working_set::WorkingSet;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, trace};

/// Default size of one simulated page
pub const DEFAULT_PAGE_SIZE_MB: u64 = 4;

/// Default number of pages tracked per tab
pub const DEFAULT_WS_CAPACITY: usize = 50;

/// Highest page id drawn when an access does not name a page
const RANDOM_PAGE_MAX: PageId = 2000;

/// Fixed cost of any snapshot
const SNAPSHOT_OVERHEAD_MB: u64 = 5;

/// Fixed latency of a snapshot-backed restore
const WARM_RESTORE_BASE: Duration = Duration::from_millis(50);

/// Fixed latency of a restore that rebuilds state from scratch
const COLD_RESTORE_BASE: Duration = Duration::from_millis(500);

/// Errors raised by tab operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TabError {
    #[error("Tab {0} is suspended")]
    Suspended(TabId),

    #[error("Unknown activity intensity: {0}")]
    UnknownIntensity(String),
}

/// Per-tab sizing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TabConfig {
    /// Size of one page in MB
    pub page_size_mb: u64,
    /// Maximum number of pages in the working set
    pub working_set_capacity: usize,
}

impl Default for TabConfig {
    fn default() -> Self {
        Self {
            page_size_mb: DEFAULT_PAGE_SIZE_MB,
            working_set_capacity: DEFAULT_WS_CAPACITY,
        }
    }
}

/// A simulated browser tab.
#[derive(Debug, Clone)]
pub struct Tab {
    /// Unique identifier
    id: TabId,
    /// Memory held while active, independent of activity
    base_memory_mb: u64,
    /// Memory that grows and shrinks with activity
    extra_memory_mb: u64,
    /// Size of one page
    page_size_mb: u64,
    /// Recently touched pages
    working_set: WorkingSet,
    is_suspended: bool,
    has_snapshot: bool,
    snapshot_size_mb: Option<u64>,
    /// Set only while suspended
    suspended_at: Option<Instant>,
    suspend_count: u64,
    restore_count: u64,
    total_time_suspended: Duration,
}

impl Tab {
    /// Create a new tab with default page size and working-set capacity.
    pub fn new(id: impl Into<TabId>, base_memory_mb: u64, extra_memory_mb: u64) -> Self {
        Self::with_config(id, base_memory_mb, extra_memory_mb, TabConfig::default())
    }

    /// Create a new tab with explicit sizing parameters.
    pub fn with_config(
        id: impl Into<TabId>,
        base_memory_mb: u64,
        extra_memory_mb: u64,
        config: TabConfig,
    ) -> Self {
        let id = id.into();
        debug!(tab_id = %id, base_memory_mb, extra_memory_mb, "Creating tab");

        Self {
            id,
            base_memory_mb,
            extra_memory_mb,
            page_size_mb: config.page_size_mb,
            working_set: WorkingSet::new(config.working_set_capacity),
            is_suspended: false,
            has_snapshot: false,
            snapshot_size_mb: None,
            suspended_at: None,
            suspend_count: 0,
            restore_count: 0,
            total_time_suspended: Duration::ZERO,
        }
    }

    /// Get the tab ID.
    pub fn id(&self) -> &TabId {
        &self.id
    }

    pub fn base_memory_mb(&self) -> u64 {
        self.base_memory_mb
    }

    pub fn extra_memory_mb(&self) -> u64 {
        self.extra_memory_mb
    }

    pub fn page_size_mb(&self) -> u64 {
        self.page_size_mb
    }

    /// Memory currently charged to this tab: zero while suspended.
    pub fn memory_usage_mb(&self) -> u64 {
        if self.is_suspended {
            0
        } else {
            self.resident_memory_mb()
        }
    }

    /// Memory the tab holds whenever it is active.
    fn resident_memory_mb(&self) -> u64 {
        self.base_memory_mb.saturating_add(self.extra_memory_mb)
    }

    // --- working set ---

    /// Record an access to `page_id`, making it the most recent page.
    pub fn update_working_set(&mut self, page_id: PageId) {
        if let Some(evicted) = self.working_set.touch(page_id) {
            trace!(tab_id = %self.id, page_id = evicted, "Page left working set");
        }
    }

    /// Number of pages in the working set.
    pub fn working_set_size_pages(&self) -> usize {
        self.working_set.len()
    }

    /// Pages in the working set, oldest first.
    pub fn working_set_pages(&self) -> Vec<PageId> {
        self.working_set.pages().collect()
    }

    /// Access stamp of the most recently touched page, 0 if none.
    pub fn last_access_stamp(&self) -> u64 {
        self.working_set.last_access_stamp()
    }

    pub fn working_set(&self) -> &WorkingSet {
        &self.working_set
    }

    // --- activity ---

    /// Touch a page (a random one when `page_id` is `None`) and let the
    /// activity-driven memory drift.
    pub fn access_page<R: Rng + ?Sized>(
        &mut self,
        page_id: Option<PageId>,
        rng: &mut R,
    ) -> Result<(), TabError> {
        if self.is_suspended {
            return Err(TabError::Suspended(self.id.clone()));
        }

        let page_id = page_id.unwrap_or_else(|| rng.gen_range(1..=RANDOM_PAGE_MAX));
        self.update_working_set(page_id);

        let delta: i64 = rng.gen_range(-5..=10);
        self.extra_memory_mb = self.extra_memory_mb.saturating_add_signed(delta);
        Ok(())
    }

    /// Run a burst of page accesses. Suspended tabs do nothing.
    ///
    /// Returns the number of pages accessed.
    pub fn simulate_activity<R: Rng + ?Sized>(
        &mut self,
        intensity: ActivityIntensity,
        rng: &mut R,
    ) -> Result<u32, TabError> {
        if self.is_suspended {
            return Ok(0);
        }

        let repeats = intensity.repeats(rng);
        for _ in 0..repeats {
            self.access_page(None, rng)?;
        }
        Ok(repeats)
    }

    // --- suspend / restore ---

    /// Compute and record the snapshot size for the current working set.
    ///
    /// `floor(pages * page_size * 0.6) + 5`, in whole MB.
    pub fn create_snapshot(&mut self) -> u64 {
        let pages = self.working_set_size_pages() as u64;
        let size_mb = (pages.saturating_mul(self.page_size_mb).saturating_mul(6) / 10)
            .saturating_add(SNAPSHOT_OVERHEAD_MB);
        self.has_snapshot = true;
        self.snapshot_size_mb = Some(size_mb);
        size_mb
    }

    /// Move the tab into the suspended state.
    pub fn suspend(&mut self, save_snapshot: bool) {
        if self.is_suspended {
            return;
        }
        if save_snapshot {
            self.create_snapshot();
        }
        self.is_suspended = true;
        self.suspended_at = Some(Instant::now());
        self.suspend_count += 1;
        debug!("Suspended tab {} (snapshot: {:?} MB)", self.id, self.snapshot_size_mb);
    }

    /// Bring the tab back and return the simulated restore latency.
    pub fn restore(&mut self, use_snapshot: bool) -> Duration {
        if !self.is_suspended {
            return Duration::ZERO;
        }

        let latency = match self.snapshot_size_mb {
            Some(size_mb) if use_snapshot && self.has_snapshot => {
                WARM_RESTORE_BASE + Duration::from_millis(size_mb)
            }
            _ => COLD_RESTORE_BASE + Duration::from_millis(self.resident_memory_mb()),
        };

        self.is_suspended = false;
        self.restore_count += 1;
        if let Some(since) = self.suspended_at.take() {
            self.total_time_suspended += since.elapsed();
        }
        debug!("Restored tab {} in {:?}", self.id, latency);
        latency
    }

    pub fn is_suspended(&self) -> bool {
        self.is_suspended
    }

    pub fn has_snapshot(&self) -> bool {
        self.has_snapshot
    }

    pub fn snapshot_size_mb(&self) -> Option<u64> {
        self.snapshot_size_mb
    }

    pub fn suspended_at(&self) -> Option<Instant> {
        self.suspended_at
    }

    pub fn suspend_count(&self) -> u64 {
        self.suspend_count
    }

    pub fn restore_count(&self) -> u64 {
        self.restore_count
    }

    /// Total time spent suspended across completed suspensions.
    pub fn total_time_suspended(&self) -> Duration {
        self.total_time_suspended
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_suspended { "SUSPENDED" } else { "ACTIVE" };
        write!(
            f,
            "<Tab {} | {} | mem={}MB | ws={}>",
            self.id,
            state,
            self.memory_usage_mb(),
            self.working_set_size_pages()
        )
    }
}
