//! Memory pressure levels relative to the system ceiling.
//!
//! - Low: < 50% of the ceiling (normal operation)
//! - Medium: 50-80% of the ceiling
//! - High: 80-100% of the ceiling
//! - Critical: over the ceiling (the reclamation loop must act)

use serde::Serialize;

/// Memory pressure levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryPressureLevel {
    /// Under 50% of the ceiling
    Low,
    /// 50-80% of the ceiling
    Medium,
    /// 80-100% of the ceiling
    High,
    /// Over the ceiling
    Critical,
}

impl MemoryPressureLevel {
    /// Determine pressure level from usage and ceiling
    pub fn from_usage(usage_mb: u64, ceiling_mb: u64) -> Self {
        if ceiling_mb == 0 {
            return if usage_mb > 0 { Self::Critical } else { Self::Low };
        }

        let ratio = usage_mb as f64 / ceiling_mb as f64;

        if ratio > 1.0 {
            Self::Critical
        } else if ratio >= 0.8 {
            Self::High
        } else if ratio >= 0.5 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    /// Get human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Low => "Low (normal operation)",
            Self::Medium => "Medium (approaching ceiling)",
            Self::High => "High (near ceiling)",
            Self::Critical => "Critical (over ceiling)",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pressure_levels() {
        let ceiling = 1000;

        assert_eq!(MemoryPressureLevel::from_usage(400, ceiling), MemoryPressureLevel::Low);
        assert_eq!(MemoryPressureLevel::from_usage(600, ceiling), MemoryPressureLevel::Medium);
        assert_eq!(MemoryPressureLevel::from_usage(900, ceiling), MemoryPressureLevel::High);
        assert_eq!(MemoryPressureLevel::from_usage(1000, ceiling), MemoryPressureLevel::High);
        assert_eq!(MemoryPressureLevel::from_usage(1001, ceiling), MemoryPressureLevel::Critical);
    }

    #[test]
    fn test_zero_ceiling() {
        assert_eq!(MemoryPressureLevel::from_usage(0, 0), MemoryPressureLevel::Low);
        assert_eq!(MemoryPressureLevel::from_usage(1, 0), MemoryPressureLevel::Critical);
    }
}
