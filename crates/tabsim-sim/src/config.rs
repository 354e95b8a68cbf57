//! Simulation configuration
//!
//! All knobs of a run live in one value object that can be loaded from
//! TOML or JSON. Missing fields fall back to the defaults below.

use crate::error::SimError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tabsim_memory::EvictionPolicy;
use tabsim_tabs::TabConfig;

/// Upper bound for any memory figure a run can produce
pub const MAX_MEMORY_MB: u64 = 1 << 40;

/// Most memory one activity tick can add to a tab (6 accesses of +10 MB)
const MAX_GROWTH_PER_TICK_MB: u64 = 60;

/// Inclusive integer range used for randomized tab parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: u64,
    pub max: u64,
}

impl ValueRange {
    pub const fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    fn check(&self, name: &str) -> Result<(), SimError> {
        if self.min > self.max {
            return Err(SimError::InvalidConfig(format!(
                "{name}: min ({}) is greater than max ({})",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

/// Complete configuration of a simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of tabs created at start
    pub tabs: usize,
    /// Number of ticks to simulate
    pub ticks: u64,
    /// System memory ceiling enforced every tick
    pub system_limit_mb: u64,
    /// Eviction policy used by the reclamation loop
    pub policy: EvictionPolicy,
    /// Seed for every random decision in the run
    pub seed: u64,
    /// Chance that landing on a suspended tab restores it
    pub restore_probability: f64,
    /// Highest page id used for pre-loaded pages
    pub initial_page_id_max: u32,
    /// Block for suspend/restore latencies in real time
    pub simulate_wait: bool,
    /// Fixed cost drawn per tab
    pub base_memory_mb: ValueRange,
    /// Initial activity-driven cost drawn per tab
    pub extra_memory_mb: ValueRange,
    /// Number of pages pre-loaded into each working set
    pub initial_pages: ValueRange,
    /// Page size and working-set capacity for every tab
    pub tab: TabConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tabs: 12,
            ticks: 200,
            system_limit_mb: 1000,
            policy: EvictionPolicy::WorkingSet,
            seed: 42,
            restore_probability: 0.5,
            initial_page_id_max: 500,
            simulate_wait: false,
            base_memory_mb: ValueRange::new(30, 300),
            extra_memory_mb: ValueRange::new(0, 200),
            initial_pages: ValueRange::new(0, 8),
            tab: TabConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Load from TOML file
    pub fn from_toml_file(path: &Path) -> Result<Self, SimError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load from TOML string
    pub fn from_toml(content: &str) -> Result<Self, SimError> {
        toml::from_str(content).map_err(|e| SimError::Parse(e.to_string()))
    }

    /// Load from JSON string
    pub fn from_json(content: &str) -> Result<Self, SimError> {
        serde_json::from_str(content).map_err(|e| SimError::Parse(e.to_string()))
    }

    /// Export as TOML
    pub fn to_toml(&self) -> Result<String, SimError> {
        toml::to_string_pretty(self).map_err(|e| SimError::Parse(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), SimError> {
        if self.tabs == 0 {
            return Err(SimError::InvalidConfig("at least one tab is required".into()));
        }
        if self.ticks == 0 {
            return Err(SimError::InvalidConfig("at least one tick is required".into()));
        }
        if !(0.0..=1.0).contains(&self.restore_probability) {
            return Err(SimError::InvalidConfig(format!(
                "restore_probability must be in [0, 1], got {}",
                self.restore_probability
            )));
        }
        if self.initial_page_id_max == 0 {
            return Err(SimError::InvalidConfig("initial_page_id_max must be > 0".into()));
        }
        self.base_memory_mb.check("base_memory_mb")?;
        self.extra_memory_mb.check("extra_memory_mb")?;
        self.initial_pages.check("initial_pages")?;
        self.check_memory_bounds()
    }

    /// Every snapshot and the total usage of all tabs must stay under
    /// `MAX_MEMORY_MB` for the whole run.
    fn check_memory_bounds(&self) -> Result<(), SimError> {
        let snapshot_mb = (self.tab.working_set_capacity as u64)
            .checked_mul(self.tab.page_size_mb)
            .and_then(|v| v.checked_mul(6))
            .map(|v| v / 10);
        if !snapshot_mb.is_some_and(|mb| mb <= MAX_MEMORY_MB) {
            return Err(SimError::InvalidConfig(format!(
                "page_size_mb ({}) x working_set_capacity ({}) exceeds {MAX_MEMORY_MB} MB snapshots",
                self.tab.page_size_mb, self.tab.working_set_capacity
            )));
        }

        let peak_mb = self
            .ticks
            .checked_mul(MAX_GROWTH_PER_TICK_MB)
            .and_then(|growth| growth.checked_add(self.base_memory_mb.max))
            .and_then(|per_tab| per_tab.checked_add(self.extra_memory_mb.max))
            .and_then(|per_tab| per_tab.checked_mul(self.tabs as u64));
        if !peak_mb.is_some_and(|mb| mb <= MAX_MEMORY_MB) {
            return Err(SimError::InvalidConfig(format!(
                "{} tabs with up to {} + {} MB each over {} ticks can exceed {MAX_MEMORY_MB} MB",
                self.tabs, self.base_memory_mb.max, self.extra_memory_mb.max, self.ticks
            )));
        }
        Ok(())
    }
}
