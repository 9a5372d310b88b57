//! Crowd report source.
//!
//! Nearby users answer a validation request with free-form reports. The
//! feed backend (socket layer, out of scope here) delivers them on a
//! channel; the adapter scores each report through the factor model and
//! publishes it as `crowd_report` evidence.

use async_trait::async_trait;
use beacon_core::emergency::{Emergency, GeoPoint};
use beacon_core::evidence::{Evidence, EvidenceCategory, TrustContribution};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::{EvidenceSink, EvidenceSource, SourceCollectionError};

/// A validation report submitted by a nearby user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrowdReport {
    /// Reporting user, as known to the identity subsystem.
    pub reporter_id: String,
    /// Reporter's standing trust, from the reputation store.
    pub reporter_trust: f64,
    /// Where the report was filed, if the client shared it.
    pub location: Option<GeoPoint>,
    /// When the report was filed.
    pub reported_at: DateTime<Utc>,
    /// Free-form report text.
    pub body: String,
    /// Content quality, from the scoring oracle.
    pub content_quality: f64,
}

/// Delivers crowd reports for one emergency.
///
/// Implemented by the ingest layer; mocked in tests.
#[async_trait]
pub trait CrowdReportFeed: Send + Sync {
    /// Subscribes to reports answering the validation request for
    /// `emergency`. The channel closes when the feed is exhausted.
    ///
    /// # Errors
    ///
    /// Returns a [`SourceCollectionError`] when the subscription cannot be
    /// established.
    async fn subscribe(
        &self,
        emergency: &Emergency,
    ) -> Result<mpsc::Receiver<CrowdReport>, SourceCollectionError>;
}

/// Factor weights for per-report trust.
///
/// The reporter's standing history dominates; locality, recency, and
/// content quality share the remainder.
const REPORTER_TRUST_WEIGHT: f64 = 0.40;
const LOCATION_WEIGHT: f64 = 0.20;
const TIME_WEIGHT: f64 = 0.20;
const CONTENT_WEIGHT: f64 = 0.20;

/// Reports further than this from the emergency score zero on locality.
const LOCATION_FALLOFF_M: f64 = 1_000.0;

/// Reports older than this relative to the emergency score zero on recency.
const TIME_FALLOFF_SECS: f64 = 900.0;

/// Scores one crowd report against the emergency it answers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportAssessor;

impl ReportAssessor {
    /// Creates an assessor.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes the report's trust contribution from reporter standing,
    /// locality, recency, and content quality.
    #[must_use]
    pub fn assess(&self, emergency: &Emergency, report: &CrowdReport) -> TrustContribution {
        let locality = report.location.map_or(0.0, |location| {
            let distance = emergency.location.distance_m(&location);
            (1.0 - distance / LOCATION_FALLOFF_M).clamp(0.0, 1.0)
        });

        let elapsed = (report.reported_at - emergency.reported_at)
            .num_seconds()
            .unsigned_abs();
        #[allow(clippy::cast_precision_loss)]
        let recency = (1.0 - elapsed as f64 / TIME_FALLOFF_SECS).clamp(0.0, 1.0);

        TrustContribution::new(
            report.reporter_trust.clamp(0.0, 1.0) * REPORTER_TRUST_WEIGHT
                + locality * LOCATION_WEIGHT
                + recency * TIME_WEIGHT
                + report.content_quality.clamp(0.0, 1.0) * CONTENT_WEIGHT,
        )
    }
}

/// Evidence source over a crowd report feed.
pub struct CrowdReportSource {
    feed: Arc<dyn CrowdReportFeed>,
    assessor: ReportAssessor,
}

impl CrowdReportSource {
    /// Creates the source over a feed backend.
    #[must_use]
    pub fn new(feed: Arc<dyn CrowdReportFeed>) -> Self {
        Self {
            feed,
            assessor: ReportAssessor::new(),
        }
    }
}

#[async_trait]
impl EvidenceSource for CrowdReportSource {
    fn name(&self) -> &str {
        "crowd_reports"
    }

    fn category(&self) -> EvidenceCategory {
        EvidenceCategory::CrowdReport
    }

    async fn collect(
        &self,
        emergency: &Emergency,
        sink: EvidenceSink,
    ) -> Result<(), SourceCollectionError> {
        let mut reports = self.feed.subscribe(emergency).await?;
        while let Some(report) = reports.recv().await {
            let trust = self.assessor.assess(emergency, &report);
            let payload = json!({
                "reporter_id": report.reporter_id,
                "body": report.body,
                "reported_at": report.reported_at,
            });
            let evidence =
                Evidence::new(EvidenceCategory::CrowdReport, trust, payload, self.name());
            if sink.publish(evidence).await.is_err() {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod unit_tests {
    use chrono::TimeDelta;

    use super::*;

    fn emergency() -> Emergency {
        Emergency::new(
            beacon_core::emergency::EmergencyKind::Fire,
            GeoPoint::new(48.8566, 2.3522),
        )
    }

    fn report(emergency: &Emergency) -> CrowdReport {
        CrowdReport {
            reporter_id: "user-1".to_string(),
            reporter_trust: 1.0,
            location: Some(emergency.location),
            reported_at: emergency.reported_at,
            body: "flames visible".to_string(),
            content_quality: 1.0,
        }
    }

    #[test]
    fn test_perfect_report_scores_one() {
        let emergency = emergency();
        let trust = ReportAssessor::new().assess(&emergency, &report(&emergency));
        assert!((trust.value() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_location_forfeits_locality_factor() {
        let emergency = emergency();
        let mut report = report(&emergency);
        report.location = None;
        let trust = ReportAssessor::new().assess(&emergency, &report);
        assert!((trust.value() - 0.8).abs() < 1e-9, "got {}", trust.value());
    }

    #[test]
    fn test_distance_decays_locality_linearly() {
        let emergency = emergency();
        let mut report = report(&emergency);
        // ~500 m north of the emergency: locality halves.
        report.location = Some(GeoPoint::new(48.8566 + 0.0045, 2.3522));
        let trust = ReportAssessor::new().assess(&emergency, &report);
        assert!((trust.value() - 0.9).abs() < 0.01, "got {}", trust.value());
    }

    #[test]
    fn test_stale_report_forfeits_recency_factor() {
        let emergency = emergency();
        let mut report = report(&emergency);
        report.reported_at = emergency.reported_at + TimeDelta::seconds(3_600);
        let trust = ReportAssessor::new().assess(&emergency, &report);
        assert!((trust.value() - 0.8).abs() < 1e-9, "got {}", trust.value());
    }

    #[test]
    fn test_out_of_range_oracle_values_are_clamped() {
        let emergency = emergency();
        let mut report = report(&emergency);
        report.reporter_trust = 9.0;
        report.content_quality = -3.0;
        let trust = ReportAssessor::new().assess(&emergency, &report);
        assert!((trust.value() - 0.8).abs() < 1e-9, "got {}", trust.value());
    }
}
