//! Tab model for the tab memory simulator
//!
//! Each tab carries:
//! - A fixed base cost and an activity-driven extra cost
//! - A bounded, recency-ordered working set of page ids
//! - Suspension state, snapshot size and suspend/restore counters

mod tab;
mod types;
mod working_set;

pub use tab::{DEFAULT_PAGE_SIZE_MB, DEFAULT_WS_CAPACITY, Tab, TabConfig, TabError};
pub use types::{ActivityIntensity, PageId, TabId};
pub use working_set::WorkingSet;
