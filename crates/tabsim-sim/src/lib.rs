//! Tab memory simulation driver
//!
//! Builds a set of randomized tabs, advances discrete ticks of user
//! activity, runs the memory manager every tick and reports:
//! - A tick-indexed trace of total memory usage (CSV)
//! - Suspend/restore counts with restore latency statistics
//! - Per-tab final state (text or JSON summary)
//!
//! All randomness is derived from the configured seed.

mod config;
mod driver;
mod error;
mod report;

pub use config::{MAX_MEMORY_MB, SimulationConfig, ValueRange};
pub use driver::{Simulation, TickOutcome};
pub use error::SimError;
pub use report::{SimulationReport, TabSummary, TracePoint};

/// Run a complete simulation with the given configuration.
pub fn run_simulation(config: SimulationConfig) -> Result<SimulationReport, SimError> {
    Simulation::new(config)?.run()
}
