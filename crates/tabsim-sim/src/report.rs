//! Run reporting: memory trace CSV, text summary and JSON summary.

use crate::config::SimulationConfig;
use crate::error::SimError;
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tabsim_memory::{EvictionPolicy, MemoryManager, ReclaimStats};
use tabsim_tabs::{Tab, TabId};
use tracing::info;

/// Total memory usage at the end of one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TracePoint {
    pub tick: u64,
    pub mem_mb: u64,
}

/// Final state of one tab
#[derive(Debug, Clone, Serialize)]
pub struct TabSummary {
    pub id: TabId,
    pub suspended: bool,
    pub memory_mb: u64,
    pub working_set_pages: usize,
    pub snapshot_size_mb: Option<u64>,
    pub suspend_count: u64,
    pub restore_count: u64,
    pub total_time_suspended_s: f64,
}

impl From<&Tab> for TabSummary {
    fn from(tab: &Tab) -> Self {
        Self {
            id: tab.id().clone(),
            suspended: tab.is_suspended(),
            memory_mb: tab.memory_usage_mb(),
            working_set_pages: tab.working_set_size_pages(),
            snapshot_size_mb: tab.snapshot_size_mb(),
            suspend_count: tab.suspend_count(),
            restore_count: tab.restore_count(),
            total_time_suspended_s: tab.total_time_suspended().as_secs_f64(),
        }
    }
}

/// Everything a finished (or paused) run produced
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub policy: EvictionPolicy,
    pub seed: u64,
    pub ticks: u64,
    pub system_limit_mb: u64,
    pub tab_count: usize,
    pub final_memory_mb: u64,
    pub peak_memory_mb: u64,
    /// Ticks that ended with usage above the ceiling
    pub ticks_over_ceiling: u64,
    pub suspend_events: u64,
    pub restore_events: u64,
    pub avg_restore_latency_s: Option<f64>,
    pub max_restore_latency_s: Option<f64>,
    pub tabs: Vec<TabSummary>,
    /// Written separately as CSV
    #[serde(skip)]
    pub trace: Vec<TracePoint>,
}

impl SimulationReport {
    /// Build a report from the public state of a run.
    pub fn collect(
        config: &SimulationConfig,
        manager: &MemoryManager,
        stats: &ReclaimStats,
        trace: &[TracePoint],
    ) -> Self {
        Self {
            policy: config.policy,
            seed: config.seed,
            ticks: trace.len() as u64,
            system_limit_mb: manager.ceiling_mb(),
            tab_count: manager.tab_count(),
            final_memory_mb: manager.total_memory_usage(),
            peak_memory_mb: stats.peak_memory_mb,
            ticks_over_ceiling: stats.samples_over_ceiling,
            suspend_events: stats.suspend_events,
            restore_events: stats.restore_events,
            avg_restore_latency_s: stats.average_restore_latency().map(|d| d.as_secs_f64()),
            max_restore_latency_s: stats.max_restore_latency().map(|d| d.as_secs_f64()),
            tabs: manager.tabs().iter().map(TabSummary::from).collect(),
            trace: trace.to_vec(),
        }
    }

    /// Write the memory trace as `tick,mem_mb` rows.
    pub fn write_trace_csv<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(writer, "tick,mem_mb")?;
        for point in &self.trace {
            writeln!(writer, "{},{}", point.tick, point.mem_mb)?;
        }
        Ok(())
    }

    /// Write the memory trace CSV to `path`.
    pub fn write_trace_csv_file(&self, path: &Path) -> Result<(), SimError> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_trace_csv(&mut writer)?;
        writer.flush()?;

        info!("Wrote {} trace rows to {}", self.trace.len(), path.display());
        Ok(())
    }

    /// Export the summary (without the trace) as JSON
    pub fn to_json(&self) -> Result<String, SimError> {
        serde_json::to_string_pretty(self).map_err(|e| SimError::Parse(e.to_string()))
    }
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Simulation summary ===")?;
        writeln!(f, "Policy: {}", self.policy)?;
        writeln!(f, "Final memory usage (MB): {}", self.final_memory_mb)?;
        writeln!(
            f,
            "Peak memory usage: {} (limit {})",
            ReclaimStats::format_mb(self.peak_memory_mb),
            ReclaimStats::format_mb(self.system_limit_mb)
        )?;
        writeln!(f, "Ticks over limit: {}", self.ticks_over_ceiling)?;
        writeln!(f, "Tabs total: {}", self.tab_count)?;
        writeln!(f, "Total suspensions: {}", self.suspend_events)?;
        writeln!(f, "Total restores: {}", self.restore_events)?;
        match (self.avg_restore_latency_s, self.max_restore_latency_s) {
            (Some(avg), Some(max)) => {
                writeln!(f, "Avg restore latency (s): {avg:.4}")?;
                write!(f, "Max restore latency (s): {max:.4}")
            }
            _ => write!(f, "No restores recorded"),
        }
    }
}
