//! Eviction policies understood by the memory manager.

use crate::manager::MemoryError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Strategy used to pick the next tab to suspend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionPolicy {
    /// Suspend the tab with the smallest working set first
    #[default]
    WorkingSet,
    /// Suspend the tab whose most recent page access is oldest
    Lru,
    /// Suspend a uniformly random candidate
    Random,
    /// Never suspend anything
    None,
}

impl EvictionPolicy {
    /// All policies, in declaration order.
    pub const ALL: [EvictionPolicy; 4] = [Self::WorkingSet, Self::Lru, Self::Random, Self::None];

    /// Configuration name of the policy.
    pub fn name(&self) -> &'static str {
        match self {
            Self::WorkingSet => "working_set",
            Self::Lru => "lru",
            Self::Random => "random",
            Self::None => "none",
        }
    }
}

impl fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EvictionPolicy {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| MemoryError::UnknownPolicy(s.to_string()))
    }
}
