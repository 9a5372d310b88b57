//! Composite trust scoring.
//!
//! The scorer is a pure function over the evidence ledger: each category's
//! sub-score is the arithmetic mean of its items' trust contributions (0
//! when the category is empty), multiplied by the category's static weight,
//! then summed. Aggregation is commutative, so the result never depends on
//! arrival order.
//!
//! Empty categories contribute 0 to the weighted sum and the weights are
//! NOT renormalized over the categories that did report. A session backed
//! by a single category therefore tops out at that category's weight, and
//! adding a weaker item to a category can lower the composite score. This
//! is the deployed validation policy, preserved as-is.

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::evidence::{EvidenceCategory, EvidenceLedger};

/// Tolerance for the weights-sum-to-one check.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Errors from weight validation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WeightsError {
    /// A single weight fell outside `[0, 1]`.
    #[error("weight for {category} out of range: {value}")]
    OutOfRange {
        /// The offending category.
        category: EvidenceCategory,
        /// The offending value.
        value: f64,
    },

    /// The weights do not sum to 1.0.
    #[error("category weights must sum to 1.0, got {sum}")]
    NotNormalized {
        /// The actual sum.
        sum: f64,
    },
}

/// Static per-category weights, summing to 1.0.
///
/// Read-only once the coordinator is constructed; there is no runtime
/// mutation surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrustWeights {
    /// Weight of crowd reports.
    pub crowd_report: f64,
    /// Weight of analyzed media.
    pub media_evidence: f64,
    /// Weight of social-media mentions.
    pub social_media: f64,
    /// Weight of nearby-device observations.
    pub nearby_device: f64,
    /// Weight of official bulletins.
    pub official_source: f64,
}

impl TrustWeights {
    /// The deployed validation policy weights.
    pub const SOURCE_POLICY: Self = Self {
        crowd_report: 0.30,
        media_evidence: 0.25,
        social_media: 0.15,
        nearby_device: 0.10,
        official_source: 0.20,
    };

    /// Returns the weight for a category.
    #[must_use]
    pub const fn weight(&self, category: EvidenceCategory) -> f64 {
        match category {
            EvidenceCategory::CrowdReport => self.crowd_report,
            EvidenceCategory::MediaEvidence => self.media_evidence,
            EvidenceCategory::SocialMedia => self.social_media,
            EvidenceCategory::NearbyDevice => self.nearby_device,
            EvidenceCategory::OfficialSource => self.official_source,
        }
    }

    /// Checks that every weight lies in `[0, 1]` and the sum is 1.0.
    ///
    /// # Errors
    ///
    /// Returns [`WeightsError::OutOfRange`] or [`WeightsError::NotNormalized`]
    /// on violation.
    pub fn validate(&self) -> Result<(), WeightsError> {
        for category in EvidenceCategory::all() {
            let value = self.weight(*category);
            if !(0.0..=1.0).contains(&value) || !value.is_finite() {
                return Err(WeightsError::OutOfRange {
                    category: *category,
                    value,
                });
            }
        }
        let sum: f64 = EvidenceCategory::all()
            .iter()
            .map(|c| self.weight(*c))
            .sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(WeightsError::NotNormalized { sum });
        }
        Ok(())
    }
}

impl Default for TrustWeights {
    fn default() -> Self {
        Self::SOURCE_POLICY
    }
}

/// Pure composite trust scorer over an evidence ledger.
#[derive(Debug, Clone)]
pub struct TrustScorer {
    weights: TrustWeights,
}

impl TrustScorer {
    /// Creates a scorer after validating the weights.
    ///
    /// # Errors
    ///
    /// Returns a [`WeightsError`] when the weights are not a valid
    /// distribution.
    pub fn new(weights: TrustWeights) -> Result<Self, WeightsError> {
        weights.validate()?;
        Ok(Self { weights })
    }

    /// Returns the weights this scorer applies.
    #[must_use]
    pub const fn weights(&self) -> &TrustWeights {
        &self.weights
    }

    /// Computes the composite trust score in `[0, 1]`.
    ///
    /// Exactly 0.0 when the ledger holds no evidence at all.
    #[must_use]
    pub fn score(&self, ledger: &EvidenceLedger) -> f64 {
        EvidenceCategory::all()
            .iter()
            .map(|category| {
                let items = ledger.items(*category);
                if items.is_empty() {
                    0.0
                } else {
                    #[allow(clippy::cast_precision_loss)]
                    let mean = items.iter().map(|e| e.trust.value()).sum::<f64>()
                        / items.len() as f64;
                    mean * self.weights.weight(*category)
                }
            })
            .sum()
    }
}
