//! Tab memory reclamation
//!
//! Owns the set of tabs and keeps their total usage under a system
//! ceiling by suspending tabs chosen by an eviction policy.
//! Suspend and restore costs come from a synthetic latency model.

mod manager;
mod policy;
mod pressure;
mod stats;
mod suspend_restore;

pub use manager::{DEFAULT_CEILING_MB, DEFAULT_POLICY_SEED, MemoryError, MemoryManager};
pub use policy::EvictionPolicy;
pub use pressure::MemoryPressureLevel;
pub use stats::ReclaimStats;
pub use suspend_restore::SuspendRestoreCoordinator;
