//! Identifiers and activity levels shared by the tab model.

use crate::tab::TabError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique identifier for a tab.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TabId(String);

impl TabId {
    /// Create a new tab ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TabId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TabId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Identifier of a simulated page inside a tab's working set.
pub type PageId = u32;

/// How busy a tab is during one activity burst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityIntensity {
    /// Exactly one page access
    Low,
    /// One to three page accesses
    #[default]
    Normal,
    /// Three to six page accesses
    High,
}

impl ActivityIntensity {
    /// All intensities, in ascending order.
    pub const ALL: [ActivityIntensity; 3] = [Self::Low, Self::Normal, Self::High];

    /// Draw the number of page accesses for one burst.
    pub fn repeats<R: Rng + ?Sized>(self, rng: &mut R) -> u32 {
        match self {
            Self::Low => 1,
            Self::Normal => rng.gen_range(1..=3),
            Self::High => rng.gen_range(3..=6),
        }
    }
}

impl fmt::Display for ActivityIntensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Normal => write!(f, "normal"),
            Self::High => write!(f, "high"),
        }
    }
}

impl FromStr for ActivityIntensity {
    type Err = TabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "normal" => Ok(Self::Normal),
            "high" => Ok(Self::High),
            other => Err(TabError::UnknownIntensity(other.to_string())),
        }
    }
}
