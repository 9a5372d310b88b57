//! Response priority and escalation tiers.
//!
//! Downstream dispatch wants more than a bare score: the final trust score
//! maps onto a four-level response priority and a five-band escalation
//! tier, both carried in the finalize notification. The bands come from
//! the deployed threat-response policy.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Dispatch urgency derived from the final trust score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponsePriority {
    /// Score at or above 0.8.
    Critical,
    /// Score in `[0.6, 0.8)`.
    High,
    /// Score in `[0.4, 0.6)`.
    Medium,
    /// Everything below 0.4.
    Low,
}

impl ResponsePriority {
    /// Maps a score onto its priority band.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        let score = score.clamp(0.0, 1.0);
        if score >= 0.8 {
            Self::Critical
        } else if score >= 0.6 {
            Self::High
        } else if score >= 0.4 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    /// Returns the canonical string representation of this priority.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for ResponsePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity band derived from the final trust score.
///
/// Five bands mapped linearly over `[0, 1]`; only a perfect score lands in
/// the top band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationTier {
    /// Score in `[0, 0.25)`.
    Normal,
    /// Score in `[0.25, 0.5)`.
    Elevated,
    /// Score in `[0.5, 0.75)`.
    High,
    /// Score in `[0.75, 1)`.
    Severe,
    /// Score of exactly 1.
    Critical,
}

impl EscalationTier {
    /// Maps a score onto its escalation band.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        let score = score.clamp(0.0, 1.0);
        if score >= 1.0 {
            Self::Critical
        } else if score >= 0.75 {
            Self::Severe
        } else if score >= 0.5 {
            Self::High
        } else if score >= 0.25 {
            Self::Elevated
        } else {
            Self::Normal
        }
    }

    /// Returns the canonical string representation of this tier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Elevated => "elevated",
            Self::High => "high",
            Self::Severe => "severe",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for EscalationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_priority_bands() {
        assert_eq!(ResponsePriority::from_score(1.0), ResponsePriority::Critical);
        assert_eq!(ResponsePriority::from_score(0.8), ResponsePriority::Critical);
        assert_eq!(ResponsePriority::from_score(0.75), ResponsePriority::High);
        assert_eq!(ResponsePriority::from_score(0.6), ResponsePriority::High);
        assert_eq!(ResponsePriority::from_score(0.5), ResponsePriority::Medium);
        assert_eq!(ResponsePriority::from_score(0.0), ResponsePriority::Low);
        // Out-of-range inputs are clamped, not rejected.
        assert_eq!(ResponsePriority::from_score(7.0), ResponsePriority::Critical);
        assert_eq!(ResponsePriority::from_score(-1.0), ResponsePriority::Low);
    }

    #[test]
    fn test_escalation_bands() {
        assert_eq!(EscalationTier::from_score(1.0), EscalationTier::Critical);
        assert_eq!(EscalationTier::from_score(0.99), EscalationTier::Severe);
        assert_eq!(EscalationTier::from_score(0.75), EscalationTier::Severe);
        assert_eq!(EscalationTier::from_score(0.5), EscalationTier::High);
        assert_eq!(EscalationTier::from_score(0.25), EscalationTier::Elevated);
        assert_eq!(EscalationTier::from_score(0.0), EscalationTier::Normal);
    }

    #[test]
    fn test_tiers_are_ordered() {
        assert!(EscalationTier::Normal < EscalationTier::Critical);
        assert!(EscalationTier::High < EscalationTier::Severe);
    }
}
