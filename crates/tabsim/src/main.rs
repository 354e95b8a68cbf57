//! tabsim: Tab Memory Simulator
//!
//! Runs a tab suspension simulation under a chosen eviction policy,
//! prints a summary and writes the memory trace as CSV.
//!
//! # Examples
//!
//! ```sh
//! # Default run (12 tabs, 200 ticks, 1000 MB, working_set policy)
//! tabsim
//!
//! # Compare policies on the same seed
//! tabsim --policy lru --seed 7 --trace-out lru.csv
//! tabsim --policy random --seed 7 --trace-out random.csv --json
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tabsim_memory::EvictionPolicy;
use tabsim_sim::{SimulationConfig, run_simulation};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

// Use mimalloc as the global allocator for reduced memory fragmentation
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Simulate browser tab memory reclamation under an eviction policy.
#[derive(Parser)]
#[command(name = "tabsim", version)]
struct Cli {
    /// TOML configuration file. Flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of tabs.
    #[arg(long)]
    tabs: Option<usize>,

    /// Number of simulation ticks.
    #[arg(long)]
    ticks: Option<u64>,

    /// System memory limit in MB.
    #[arg(long)]
    limit_mb: Option<u64>,

    /// Eviction policy: working_set, lru, random or none.
    #[arg(long)]
    policy: Option<EvictionPolicy>,

    /// Seed for all random decisions.
    #[arg(long)]
    seed: Option<u64>,

    /// Sleep for suspend/restore latencies in real time.
    #[arg(long)]
    simulate_wait: bool,

    /// Where to write the memory trace CSV.
    #[arg(long, default_value = "memory_trace.csv")]
    trace_out: PathBuf,

    /// Print the summary as JSON.
    #[arg(long)]
    json: bool,

    /// Log progress at info level (RUST_LOG takes precedence).
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Load the config file (if any) and apply flag overrides.
    fn simulation_config(&self) -> Result<SimulationConfig> {
        let mut config = match &self.config {
            Some(path) => SimulationConfig::from_toml_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => SimulationConfig::default(),
        };

        if let Some(tabs) = self.tabs {
            config.tabs = tabs;
        }
        if let Some(ticks) = self.ticks {
            config.ticks = ticks;
        }
        if let Some(limit) = self.limit_mb {
            config.system_limit_mb = limit;
        }
        if let Some(policy) = self.policy {
            config.policy = policy;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        config.simulate_wait |= self.simulate_wait;

        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let config = cli.simulation_config()?;
    info!("tabsim starting with {} policy", config.policy);

    let report = run_simulation(config).context("simulation failed")?;

    if cli.json {
        println!("{}", report.to_json()?);
    } else {
        println!("{report}");
    }

    report
        .write_trace_csv_file(&cli.trace_out)
        .with_context(|| format!("writing {}", cli.trace_out.display()))?;

    Ok(())
}
