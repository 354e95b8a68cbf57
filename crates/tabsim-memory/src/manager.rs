//! Memory manager - owns the tabs and enforces the system ceiling.
//!
//! The reclamation loop suspends one tab at a time until total usage is
//! back under the ceiling or no eligible candidate is left. Tabs are
//! never removed, only suspended.
//!
//! Candidates are visited in insertion order. When several tabs tie under
//! the `working_set` or `lru` policy, the one added first is suspended.

use crate::policy::EvictionPolicy;
use crate::pressure::MemoryPressureLevel;
use crate::suspend_restore::SuspendRestoreCoordinator;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::HashMap;
use tabsim_tabs::{Tab, TabId};
use thiserror::Error;
use tracing::{debug, info};

/// Default system memory ceiling
pub const DEFAULT_CEILING_MB: u64 = 4096;

/// Seed used for the `random` policy when none is given
pub const DEFAULT_POLICY_SEED: u64 = 0x7AB5_1A11;

/// Errors from the memory manager
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("Unknown eviction policy: {0:?}")]
    UnknownPolicy(String),

    #[error("Tab already registered: {0}")]
    DuplicateTab(TabId),
}

/// Owns all tabs and the system memory ceiling.
#[derive(Debug)]
pub struct MemoryManager {
    /// Tabs in insertion order
    tabs: Vec<Tab>,
    /// Position of each tab in `tabs`
    index: HashMap<TabId, usize>,
    /// Usage above this triggers reclamation
    ceiling_mb: u64,
    /// Source of randomness for the `random` policy
    rng: StdRng,
}

impl MemoryManager {
    /// Create a manager with the given ceiling and the default policy seed.
    pub fn new(ceiling_mb: u64) -> Self {
        Self::with_seed(ceiling_mb, DEFAULT_POLICY_SEED)
    }

    /// Create a manager whose `random` policy is driven by `seed`.
    pub fn with_seed(ceiling_mb: u64, seed: u64) -> Self {
        Self::with_rng(ceiling_mb, StdRng::seed_from_u64(seed))
    }

    /// Create a manager with an explicit random source.
    pub fn with_rng(ceiling_mb: u64, rng: StdRng) -> Self {
        info!("Memory manager initialized with {} MB ceiling", ceiling_mb);
        Self {
            tabs: Vec::new(),
            index: HashMap::new(),
            ceiling_mb,
            rng,
        }
    }

    /// Register a tab. Fails if a tab with the same ID already exists.
    pub fn add_tab(&mut self, tab: Tab) -> Result<(), MemoryError> {
        if self.index.contains_key(tab.id()) {
            return Err(MemoryError::DuplicateTab(tab.id().clone()));
        }
        self.index.insert(tab.id().clone(), self.tabs.len());
        self.tabs.push(tab);
        Ok(())
    }

    /// Get a reference to a tab.
    pub fn tab(&self, id: &TabId) -> Option<&Tab> {
        self.index.get(id).map(|&i| &self.tabs[i])
    }

    /// Get a mutable reference to a tab.
    pub fn tab_mut(&mut self, id: &TabId) -> Option<&mut Tab> {
        self.index.get(id).map(|&i| &mut self.tabs[i])
    }

    /// All tabs, in insertion order.
    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn tab_count(&self) -> usize {
        self.tabs.len()
    }

    pub fn suspended_count(&self) -> usize {
        self.tabs.iter().filter(|t| t.is_suspended()).count()
    }

    pub fn ceiling_mb(&self) -> u64 {
        self.ceiling_mb
    }

    /// Sum of the memory charged to every tab.
    pub fn total_memory_usage(&self) -> u64 {
        self.tabs
            .iter()
            .map(Tab::memory_usage_mb)
            .fold(0, u64::saturating_add)
    }

    /// Current usage bucketed against the ceiling.
    pub fn pressure(&self) -> MemoryPressureLevel {
        MemoryPressureLevel::from_usage(self.total_memory_usage(), self.ceiling_mb)
    }

    /// Suspend tabs chosen by `policy` until usage fits under the ceiling.
    ///
    /// `protect` is never suspended. Returns the suspended tab IDs in the
    /// order they were suspended; the list may leave usage above the
    /// ceiling when every remaining tab is protected or already suspended.
    pub fn enforce_policy(
        &mut self,
        policy: EvictionPolicy,
        protect: Option<&TabId>,
        simulate_wait: bool,
    ) -> Vec<TabId> {
        let mut suspended = Vec::new();
        if policy == EvictionPolicy::None {
            return suspended;
        }

        while self.total_memory_usage() > self.ceiling_mb {
            let Some(idx) = self.select_candidate(policy, protect) else {
                debug!(
                    "No eligible tab left under {} policy ({} MB > {} MB)",
                    policy,
                    self.total_memory_usage(),
                    self.ceiling_mb
                );
                break;
            };

            let tab = &mut self.tabs[idx];
            SuspendRestoreCoordinator::suspend_tab(tab, true, simulate_wait);
            suspended.push(tab.id().clone());
        }

        if !suspended.is_empty() {
            info!(
                "{} policy suspended {} tab(s), usage now {} MB",
                policy,
                suspended.len(),
                self.total_memory_usage()
            );
        }
        suspended
    }

    /// Pick one active, unprotected tab according to `policy`.
    fn select_candidate(&mut self, policy: EvictionPolicy, protect: Option<&TabId>) -> Option<usize> {
        let candidates = self
            .tabs
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.is_suspended() && Some(t.id()) != protect);

        match policy {
            EvictionPolicy::WorkingSet => candidates
                .min_by_key(|(_, t)| t.working_set_size_pages())
                .map(|(i, _)| i),
            EvictionPolicy::Lru => candidates
                .min_by_key(|(_, t)| t.last_access_stamp())
                .map(|(i, _)| i),
            EvictionPolicy::Random => {
                let eligible: Vec<usize> = candidates.map(|(i, _)| i).collect();
                eligible.choose(&mut self.rng).copied()
            }
            EvictionPolicy::None => None,
        }
    }
}

impl Default for MemoryManager {
    fn default() -> Self {
        Self::new(DEFAULT_CEILING_MB)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tab_with_pages(id: &str, memory_mb: u64, pages: u32) -> Tab {
        let mut tab = Tab::new(id, memory_mb, 0);
        for page in 0..pages {
            tab.update_working_set(page);
        }
        tab
    }

    fn manager_with(ceiling_mb: u64, tabs: Vec<Tab>) -> MemoryManager {
        let mut manager = MemoryManager::new(ceiling_mb);
        for tab in tabs {
            manager.add_tab(tab).unwrap();
        }
        manager
    }

    #[test]
    fn test_default_ceiling() {
        let manager = MemoryManager::default();
        assert_eq!(manager.ceiling_mb(), DEFAULT_CEILING_MB);
        assert_eq!(manager.total_memory_usage(), 0);
        assert_eq!(manager.pressure(), MemoryPressureLevel::Low);
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut manager = MemoryManager::new(1000);
        manager.add_tab(Tab::new("a", 50, 0)).unwrap();

        let err = manager.add_tab(Tab::new("a", 70, 0)).unwrap_err();
        assert_eq!(err, MemoryError::DuplicateTab(TabId::new("a")));
        assert_eq!(manager.tab_count(), 1);
        assert_eq!(manager.total_memory_usage(), 50);
    }

    #[test]
    fn test_total_memory_usage() {
        let mut manager = manager_with(1000, vec![Tab::new("a", 50, 10), Tab::new("b", 30, 0)]);
        assert_eq!(manager.total_memory_usage(), 90);

        manager.tab_mut(&TabId::new("a")).unwrap().suspend(true);
        assert_eq!(manager.total_memory_usage(), 30);
        assert_eq!(manager.suspended_count(), 1);
    }

    #[test]
    fn test_total_memory_usage_saturates() {
        let mut manager = manager_with(
            0,
            vec![Tab::new("a", u64::MAX / 4, 0), Tab::new("b", u64::MAX / 4, 0)],
        );
        for id in ["c", "d", "e"] {
            manager.add_tab(Tab::new(id, u64::MAX / 4, 0)).unwrap();
        }
        assert_eq!(manager.total_memory_usage(), u64::MAX);

        let suspended = manager.enforce_policy(EvictionPolicy::WorkingSet, None, false);
        assert_eq!(suspended.len(), 5);
        assert_eq!(manager.total_memory_usage(), 0);
    }

    #[test]
    fn test_none_policy_does_nothing() {
        let mut manager = manager_with(0, vec![Tab::new("a", 50, 0), Tab::new("b", 50, 0)]);
        assert!(manager.enforce_policy(EvictionPolicy::None, None, false).is_empty());
        assert_eq!(manager.suspended_count(), 0);
    }

    #[test]
    fn test_under_ceiling_does_nothing() {
        let mut manager = manager_with(1000, vec![Tab::new("a", 50, 0)]);
        for policy in EvictionPolicy::ALL {
            assert!(manager.enforce_policy(policy, None, false).is_empty());
        }
    }

    #[test]
    fn test_terminates_when_everything_protected_or_suspended() {
        let mut manager = manager_with(0, vec![Tab::new("a", 50, 0), Tab::new("b", 50, 0)]);
        manager.tab_mut(&TabId::new("b")).unwrap().suspend(true);

        let protect = TabId::new("a");
        for policy in EvictionPolicy::ALL {
            assert!(manager.enforce_policy(policy, Some(&protect), false).is_empty());
        }
        assert_eq!(manager.total_memory_usage(), 50);
    }

    #[test]
    fn test_working_set_policy_picks_smallest() {
        let mut manager = manager_with(
            250,
            vec![
                tab_with_pages("medium", 100, 3),
                tab_with_pages("large", 100, 5),
                tab_with_pages("small", 100, 1),
            ],
        );

        let suspended = manager.enforce_policy(EvictionPolicy::WorkingSet, None, false);
        assert_eq!(suspended, vec![TabId::new("small")]);
        assert_eq!(manager.total_memory_usage(), 200);
    }

    #[test]
    fn test_working_set_policy_order() {
        let mut manager = manager_with(
            0,
            vec![
                tab_with_pages("medium", 100, 3),
                tab_with_pages("large", 100, 5),
                tab_with_pages("small", 100, 1),
            ],
        );

        let suspended = manager.enforce_policy(EvictionPolicy::WorkingSet, None, false);
        let ids: Vec<_> = suspended.iter().map(TabId::as_str).collect();
        assert_eq!(ids, vec!["small", "medium", "large"]);
    }

    #[test]
    fn test_working_set_ties_use_insertion_order() {
        let mut manager = manager_with(
            150,
            vec![tab_with_pages("first", 100, 2), tab_with_pages("second", 100, 2)],
        );

        let suspended = manager.enforce_policy(EvictionPolicy::WorkingSet, None, false);
        assert_eq!(suspended, vec![TabId::new("first")]);
    }

    #[test]
    fn test_lru_policy_picks_least_recent() {
        let mut a = Tab::new("a", 100, 0);
        let mut b = Tab::new("b", 100, 0);
        a.update_working_set(1);
        b.update_working_set(2);
        assert!(a.last_access_stamp() < b.last_access_stamp());

        // Insert the stale tab last so insertion order cannot explain the pick
        let mut manager = manager_with(150, vec![b, a]);

        let suspended = manager.enforce_policy(EvictionPolicy::Lru, None, false);
        assert_eq!(suspended, vec![TabId::new("a")]);
    }

    #[test]
    fn test_lru_treats_empty_working_set_as_oldest() {
        let mut touched = Tab::new("touched", 100, 0);
        touched.update_working_set(1);
        let untouched = Tab::new("untouched", 100, 0);

        let mut manager = manager_with(150, vec![touched, untouched]);

        let suspended = manager.enforce_policy(EvictionPolicy::Lru, None, false);
        assert_eq!(suspended, vec![TabId::new("untouched")]);
    }

    #[test]
    fn test_protected_tab_is_skipped() {
        let mut manager = manager_with(
            120,
            vec![tab_with_pages("small", 100, 1), tab_with_pages("large", 100, 5)],
        );

        let protect = TabId::new("small");
        let suspended = manager.enforce_policy(EvictionPolicy::WorkingSet, Some(&protect), false);
        assert_eq!(suspended, vec![TabId::new("large")]);
        assert!(!manager.tab(&protect).unwrap().is_suspended());
    }

    #[test]
    fn test_suspension_saves_snapshot() {
        let mut manager = manager_with(0, vec![tab_with_pages("a", 100, 10)]);
        manager.enforce_policy(EvictionPolicy::Lru, None, false);

        let tab = manager.tab(&TabId::new("a")).unwrap();
        assert!(tab.is_suspended());
        assert_eq!(tab.snapshot_size_mb(), Some(29));
    }

    #[test]
    fn test_random_policy_is_reproducible() {
        let build = || {
            let tabs = (0..10).map(|i| Tab::new(format!("tab_{i}"), 100, 0)).collect();
            let mut manager = manager_with(450, tabs);
            manager.rng = StdRng::seed_from_u64(99);
            manager
        };

        let first = build().enforce_policy(EvictionPolicy::Random, None, false);
        let second = build().enforce_policy(EvictionPolicy::Random, None, false);

        assert_eq!(first.len(), 6);
        assert_eq!(first, second);
    }

    #[test]
    fn test_pressure() {
        let mut manager = manager_with(100, vec![Tab::new("a", 90, 0)]);
        assert_eq!(manager.pressure(), MemoryPressureLevel::High);

        manager.add_tab(Tab::new("b", 20, 0)).unwrap();
        assert_eq!(manager.pressure(), MemoryPressureLevel::Critical);
    }
}
