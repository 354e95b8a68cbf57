//! Reclamation statistics collected over a run.

use crate::pressure::MemoryPressureLevel;
use std::time::Duration;

/// Aggregate suspend/restore counters for a simulation run.
#[derive(Debug, Clone, Default)]
pub struct ReclaimStats {
    /// Tabs suspended by the reclamation loop
    pub suspend_events: u64,
    /// Tabs brought back by the driver
    pub restore_events: u64,
    /// Sum of all restore latencies
    restore_latency_total: Duration,
    /// Slowest restore seen
    restore_latency_max: Duration,
    /// Highest total usage observed
    pub peak_memory_mb: u64,
    /// Samples taken while usage exceeded the ceiling
    pub samples_over_ceiling: u64,
}

impl ReclaimStats {
    /// Create an empty stats tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record tabs suspended in one enforcement pass.
    pub fn record_suspensions(&mut self, count: usize) {
        self.suspend_events += count as u64;
    }

    /// Record a restore and its latency.
    pub fn record_restore(&mut self, latency: Duration) {
        self.restore_events += 1;
        self.restore_latency_total += latency;
        self.restore_latency_max = self.restore_latency_max.max(latency);
    }

    /// Record a usage sample.
    pub fn record_usage(&mut self, usage_mb: u64, pressure: MemoryPressureLevel) {
        self.peak_memory_mb = self.peak_memory_mb.max(usage_mb);
        if pressure == MemoryPressureLevel::Critical {
            self.samples_over_ceiling += 1;
        }
    }

    /// Mean restore latency, if any restore happened.
    pub fn average_restore_latency(&self) -> Option<Duration> {
        if self.restore_events == 0 {
            return None;
        }
        Some(self.restore_latency_total / self.restore_events as u32)
    }

    /// Slowest restore latency, if any restore happened.
    pub fn max_restore_latency(&self) -> Option<Duration> {
        (self.restore_events > 0).then_some(self.restore_latency_max)
    }

    /// Format a size in MB for display.
    pub fn format_mb(mb: u64) -> String {
        const GB: u64 = 1024;

        if mb >= GB {
            format!("{:.2} GB", mb as f64 / GB as f64)
        } else {
            format!("{} MB", mb)
        }
    }
}
