//! Simulation driver - builds the tabs and advances discrete ticks.
//!
//! Each tick lands on one random tab. A suspended tab may be restored
//! (a user switching back to it); otherwise the tab does some work and the
//! memory manager enforces the ceiling while protecting that tab.

use crate::config::{SimulationConfig, ValueRange};
use crate::error::SimError;
use crate::report::{SimulationReport, TracePoint};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::time::Duration;
use tabsim_memory::{MemoryManager, ReclaimStats, SuspendRestoreCoordinator};
use tabsim_tabs::{ActivityIntensity, Tab, TabId};
use tracing::{debug, info};

/// What happened during one tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// A suspended tab was brought back
    Restored { tab_id: TabId, latency: Duration },
    /// A tab was used and the policy ran
    Active {
        tab_id: TabId,
        accesses: u32,
        suspended: Vec<TabId>,
    },
}

/// A running simulation
pub struct Simulation {
    config: SimulationConfig,
    manager: MemoryManager,
    /// Tab IDs in creation order, used to pick the tab of each tick
    tab_ids: Vec<TabId>,
    rng: StdRng,
    stats: ReclaimStats,
    trace: Vec<TracePoint>,
    tick: u64,
}

impl Simulation {
    /// Validate the configuration and create the tabs.
    pub fn new(config: SimulationConfig) -> Result<Self, SimError> {
        config.validate()?;

        let mut rng = StdRng::seed_from_u64(config.seed);
        let policy_rng = StdRng::seed_from_u64(rng.next_u64());
        let mut manager = MemoryManager::with_rng(config.system_limit_mb, policy_rng);

        let tabs = make_tabs(&config, &mut rng);
        let tab_ids: Vec<TabId> = tabs.iter().map(|t| t.id().clone()).collect();
        for tab in tabs {
            manager.add_tab(tab)?;
        }

        info!(
            "Simulation ready: {} tabs, {} ticks, {} MB limit, {} policy (seed {})",
            config.tabs, config.ticks, config.system_limit_mb, config.policy, config.seed
        );

        Ok(Self {
            config,
            manager,
            tab_ids,
            rng,
            stats: ReclaimStats::new(),
            trace: Vec::new(),
            tick: 0,
        })
    }

    /// Run every remaining tick and build the report.
    pub fn run(mut self) -> Result<SimulationReport, SimError> {
        while self.tick < self.config.ticks {
            self.step()?;
        }

        info!(
            "Simulation finished: {} MB in use, {} suspensions, {} restores",
            self.manager.total_memory_usage(),
            self.stats.suspend_events,
            self.stats.restore_events
        );
        Ok(self.report())
    }

    /// Advance a single tick.
    pub fn step(&mut self) -> Result<TickOutcome, SimError> {
        let tab_id = self.tab_ids[self.rng.gen_range(0..self.tab_ids.len())].clone();
        let simulate_wait = self.config.simulate_wait;

        let Some(tab) = self.manager.tab_mut(&tab_id) else {
            return Err(SimError::UnknownTab(tab_id));
        };

        let outcome = if tab.is_suspended() && self.rng.gen_bool(self.config.restore_probability) {
            let latency = SuspendRestoreCoordinator::restore_tab(tab, true, simulate_wait);
            self.stats.record_restore(latency);
            debug!("Tick {}: restored {} ({:?})", self.tick, tab_id, latency);
            TickOutcome::Restored { tab_id, latency }
        } else {
            let intensity = ActivityIntensity::ALL[self.rng.gen_range(0..ActivityIntensity::ALL.len())];
            let accesses = tab.simulate_activity(intensity, &mut self.rng)?;

            let suspended = self
                .manager
                .enforce_policy(self.config.policy, Some(&tab_id), simulate_wait);
            self.stats.record_suspensions(suspended.len());
            debug!(
                "Tick {}: {} did {} access(es) at {} intensity, {} tab(s) suspended",
                self.tick,
                tab_id,
                accesses,
                intensity,
                suspended.len()
            );
            TickOutcome::Active { tab_id, accesses, suspended }
        };

        let usage = self.manager.total_memory_usage();
        self.stats.record_usage(usage, self.manager.pressure());
        self.trace.push(TracePoint {
            tick: self.tick,
            mem_mb: usage,
        });
        self.tick += 1;

        Ok(outcome)
    }

    /// Snapshot of the run so far.
    pub fn report(&self) -> SimulationReport {
        SimulationReport::collect(&self.config, &self.manager, &self.stats, &self.trace)
    }

    pub fn manager(&self) -> &MemoryManager {
        &self.manager
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Number of ticks already simulated.
    pub fn ticks_done(&self) -> u64 {
        self.tick
    }
}

/// Create `config.tabs` tabs with randomized costs and working sets.
fn make_tabs<R: Rng + ?Sized>(config: &SimulationConfig, rng: &mut R) -> Vec<Tab> {
    (1..=config.tabs)
        .map(|i| {
            let base = draw(config.base_memory_mb, rng);
            let extra = draw(config.extra_memory_mb, rng);
            let mut tab = Tab::with_config(format!("tab_{i}"), base, extra, config.tab);

            for _ in 0..draw(config.initial_pages, rng) {
                tab.update_working_set(rng.gen_range(1..=config.initial_page_id_max));
            }
            tab
        })
        .collect()
}

fn draw<R: Rng + ?Sized>(range: ValueRange, rng: &mut R) -> u64 {
    rng.gen_range(range.min..=range.max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabsim_memory::EvictionPolicy;

    fn small_config(policy: EvictionPolicy) -> SimulationConfig {
        SimulationConfig {
            tabs: 8,
            ticks: 150,
            system_limit_mb: 600,
            policy,
            seed: 1234,
            ..Default::default()
        }
    }

    #[test]
    fn test_tabs_are_created() {
        let sim = Simulation::new(small_config(EvictionPolicy::WorkingSet)).unwrap();
        let manager = sim.manager();

        assert_eq!(manager.tab_count(), 8);
        assert_eq!(manager.ceiling_mb(), 600);
        for (i, tab) in manager.tabs().iter().enumerate() {
            assert_eq!(tab.id().as_str(), format!("tab_{}", i + 1));
            assert!((30..=300).contains(&tab.base_memory_mb()));
            assert!(tab.extra_memory_mb() <= 200);
            assert!(tab.working_set_size_pages() <= 8);
        }
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = SimulationConfig {
            tabs: 0,
            ..Default::default()
        };
        assert!(matches!(Simulation::new(config), Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn test_overflowing_sizes_are_rejected() {
        let config = SimulationConfig {
            system_limit_mb: 0,
            initial_pages: ValueRange::new(1, 1),
            tab: tabsim_tabs::TabConfig {
                page_size_mb: u64::MAX / 2,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(Simulation::new(config), Err(SimError::InvalidConfig(_))));

        let config = SimulationConfig {
            base_memory_mb: ValueRange::new(u64::MAX / 4, u64::MAX / 4),
            ..Default::default()
        };
        assert!(matches!(Simulation::new(config), Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn test_trace_has_one_row_per_tick() {
        let report = Simulation::new(small_config(EvictionPolicy::Lru)).unwrap().run().unwrap();

        assert_eq!(report.trace.len(), 150);
        for (i, point) in report.trace.iter().enumerate() {
            assert_eq!(point.tick, i as u64);
        }
        assert_eq!(report.final_memory_mb, report.trace.last().unwrap().mem_mb);
    }

    #[test]
    fn test_same_seed_same_run() {
        for policy in EvictionPolicy::ALL {
            let a = Simulation::new(small_config(policy)).unwrap().run().unwrap();
            let b = Simulation::new(small_config(policy)).unwrap().run().unwrap();

            assert_eq!(a.trace, b.trace);
            assert_eq!(a.suspend_events, b.suspend_events);
            assert_eq!(a.restore_events, b.restore_events);
            assert_eq!(a.max_restore_latency_s, b.max_restore_latency_s);
        }
    }

    #[test]
    fn test_none_policy_never_suspends() {
        let report = Simulation::new(small_config(EvictionPolicy::None)).unwrap().run().unwrap();

        assert_eq!(report.suspend_events, 0);
        assert_eq!(report.restore_events, 0);
        assert!(report.tabs.iter().all(|t| !t.suspended));
    }

    #[test]
    fn test_ceiling_enforced_after_activity() {
        let mut sim = Simulation::new(small_config(EvictionPolicy::WorkingSet)).unwrap();

        for _ in 0..150 {
            if let TickOutcome::Active { tab_id, .. } = sim.step().unwrap() {
                let manager = sim.manager();
                let others_active = manager
                    .tabs()
                    .iter()
                    .filter(|t| t.id() != &tab_id && !t.is_suspended())
                    .count();
                assert!(
                    manager.total_memory_usage() <= manager.ceiling_mb() || others_active == 0,
                    "ceiling exceeded with eligible tabs left"
                );
            }
        }
        assert_eq!(sim.ticks_done(), 150);
    }

    #[test]
    fn test_counters_match_tab_state() {
        let report = Simulation::new(small_config(EvictionPolicy::Random)).unwrap().run().unwrap();

        let suspends: u64 = report.tabs.iter().map(|t| t.suspend_count).sum();
        let restores: u64 = report.tabs.iter().map(|t| t.restore_count).sum();
        assert_eq!(suspends, report.suspend_events);
        assert_eq!(restores, report.restore_events);
        assert!(report.peak_memory_mb >= report.final_memory_mb);
    }
}
