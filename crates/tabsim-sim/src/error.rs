//! Errors raised while configuring, running or reporting a simulation.

use std::io;
use tabsim_memory::MemoryError;
use tabsim_tabs::{TabError, TabId};
use thiserror::Error;

/// Simulation errors
#[derive(Debug, Error)]
pub enum SimError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unknown tab: {0}")]
    UnknownTab(TabId),

    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error(transparent)]
    Tab(#[from] TabError),
}
