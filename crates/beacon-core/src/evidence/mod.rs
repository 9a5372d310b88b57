//! Evidence items and the per-session append-only ledger.
//!
//! Evidence is produced by exactly one source for exactly one emergency,
//! tagged with a category and a trust contribution in `[0, 1]`. Items are
//! immutable once created; within a session they are append-only, never
//! deleted, never mutated. Arrivals after the session reached a terminal
//! state are still appended so the audit trail stays complete.

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Upper bound on evidence items held per category within one session.
///
/// A hostile or runaway source must not be able to grow session memory
/// without bound; overflow is surfaced to the offending source only and
/// never affects the session outcome.
pub const MAX_EVIDENCE_PER_CATEGORY: usize = 10_000;

/// Errors from evidence bookkeeping.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EvidenceError {
    /// The per-category ledger bound was reached.
    #[error("evidence ledger full for category {category}: capacity {capacity}")]
    LedgerFull {
        /// The category that overflowed.
        category: EvidenceCategory,
        /// The configured capacity.
        capacity: usize,
    },

    /// Invalid evidence category string.
    #[error("invalid evidence category: {value}")]
    InvalidCategory {
        /// The invalid value.
        value: String,
    },
}

/// Source category of an evidence item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceCategory {
    /// A validation report from a nearby user.
    CrowdReport,
    /// Analyzed photo or video material.
    MediaEvidence,
    /// A social-media mention near the emergency.
    SocialMedia,
    /// A device observed near the emergency location.
    NearbyDevice,
    /// A bulletin from an official channel.
    OfficialSource,
}

impl EvidenceCategory {
    /// Parses an evidence category from its canonical `snake_case` form.
    ///
    /// # Errors
    ///
    /// Returns [`EvidenceError::InvalidCategory`] if the string is not a
    /// recognized category.
    pub fn parse(s: &str) -> Result<Self, EvidenceError> {
        match s {
            "crowd_report" => Ok(Self::CrowdReport),
            "media_evidence" => Ok(Self::MediaEvidence),
            "social_media" => Ok(Self::SocialMedia),
            "nearby_device" => Ok(Self::NearbyDevice),
            "official_source" => Ok(Self::OfficialSource),
            _ => Err(EvidenceError::InvalidCategory {
                value: s.to_string(),
            }),
        }
    }

    /// Returns the canonical string representation of this category.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CrowdReport => "crowd_report",
            Self::MediaEvidence => "media_evidence",
            Self::SocialMedia => "social_media",
            Self::NearbyDevice => "nearby_device",
            Self::OfficialSource => "official_source",
        }
    }

    /// Returns all known categories.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::CrowdReport,
            Self::MediaEvidence,
            Self::SocialMedia,
            Self::NearbyDevice,
            Self::OfficialSource,
        ]
    }
}

impl fmt::Display for EvidenceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A per-item trust contribution, clamped to `[0, 1]` on construction.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct TrustContribution(f64);

impl TrustContribution {
    /// Clamps and wraps a raw value.
    #[must_use]
    pub fn new(value: f64) -> Self {
        Self(value.clamp(0.0, 1.0))
    }

    /// Returns the clamped value.
    #[must_use]
    pub const fn value(&self) -> f64 {
        self.0
    }
}

impl From<f64> for TrustContribution {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl From<TrustContribution> for f64 {
    fn from(trust: TrustContribution) -> Self {
        trust.value()
    }
}

/// One unit of corroborating or refuting data for an emergency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    /// Unique identifier, for audit correlation.
    pub id: Uuid,
    /// Source category.
    pub category: EvidenceCategory,
    /// Trust contribution in `[0, 1]`.
    pub trust: TrustContribution,
    /// Free-form source metadata (report text, authenticity score, ...).
    pub payload: serde_json::Value,
    /// Name of the source adapter that produced the item.
    pub source: String,
    /// When the item arrived at the session.
    pub observed_at: DateTime<Utc>,
}

impl Evidence {
    /// Creates an evidence item observed now.
    #[must_use]
    pub fn new(
        category: EvidenceCategory,
        trust: TrustContribution,
        payload: serde_json::Value,
        source: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            category,
            trust,
            payload,
            source: source.into(),
            observed_at: Utc::now(),
        }
    }
}

/// Append-only evidence collections for one session, grouped by category.
#[derive(Debug, Default)]
pub struct EvidenceLedger {
    by_category: HashMap<EvidenceCategory, Vec<Evidence>>,
}

impl EvidenceLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an item to its category collection.
    ///
    /// # Errors
    ///
    /// Returns [`EvidenceError::LedgerFull`] when the category already holds
    /// [`MAX_EVIDENCE_PER_CATEGORY`] items.
    pub fn append(&mut self, evidence: Evidence) -> Result<(), EvidenceError> {
        let items = self.by_category.entry(evidence.category).or_default();
        if items.len() >= MAX_EVIDENCE_PER_CATEGORY {
            return Err(EvidenceError::LedgerFull {
                category: evidence.category,
                capacity: MAX_EVIDENCE_PER_CATEGORY,
            });
        }
        items.push(evidence);
        Ok(())
    }

    /// Returns the items recorded for a category, in arrival order.
    #[must_use]
    pub fn items(&self, category: EvidenceCategory) -> &[Evidence] {
        self.by_category.get(&category).map_or(&[], Vec::as_slice)
    }

    /// Number of items recorded for a category.
    #[must_use]
    pub fn category_len(&self, category: EvidenceCategory) -> usize {
        self.items(category).len()
    }

    /// Total number of items across all categories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_category.values().map(Vec::len).sum()
    }

    /// Returns `true` when no evidence has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_category.values().all(Vec::is_empty)
    }
}
