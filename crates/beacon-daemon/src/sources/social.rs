//! Social-media mention source.
//!
//! A monitor backend watches public posts within a radius of the emergency
//! for kind-specific keywords. Each mention arrives with a credibility
//! score from the analysis oracle, which becomes the item's trust
//! contribution directly.

use async_trait::async_trait;
use beacon_core::emergency::{Emergency, EmergencyKind};
use beacon_core::evidence::{Evidence, EvidenceCategory, TrustContribution};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::{EvidenceSink, EvidenceSource, SourceCollectionError};

/// Default monitoring radius around the emergency, in meters.
pub const DEFAULT_MONITOR_RADIUS_M: u32 = 5_000;

/// What the monitor backend should watch for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialMonitorConfig {
    /// Radius around the emergency location, in meters.
    pub radius_m: u32,
    /// Keywords to match, derived from the emergency kind.
    pub keywords: Vec<String>,
}

impl SocialMonitorConfig {
    /// Builds the monitor configuration for one emergency.
    #[must_use]
    pub fn for_emergency(emergency: &Emergency) -> Self {
        Self {
            radius_m: DEFAULT_MONITOR_RADIUS_M,
            keywords: keywords_for(emergency.kind),
        }
    }
}

/// Keyword set per emergency kind. "emergency" is always included.
fn keywords_for(kind: EmergencyKind) -> Vec<String> {
    let specific: &[&str] = match kind {
        EmergencyKind::Sos => &["sos", "help"],
        EmergencyKind::Medical => &["ambulance", "injured", "collapsed"],
        EmergencyKind::Fire => &["fire", "smoke", "burning"],
        EmergencyKind::Crime => &["police", "attack", "robbery"],
        EmergencyKind::Accident => &["crash", "accident", "collision"],
        EmergencyKind::NaturalDisaster => &["flood", "earthquake", "storm"],
        _ => &[],
    };
    specific
        .iter()
        .map(ToString::to_string)
        .chain(std::iter::once("emergency".to_string()))
        .collect()
}

/// A public post matching the monitor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialMention {
    /// Posting account handle.
    pub handle: String,
    /// Post text.
    pub text: String,
    /// Credibility in `[0, 1]`, from the analysis oracle.
    pub credibility: f64,
    /// When the post was published.
    pub posted_at: DateTime<Utc>,
}

/// Watches social media for mentions near an emergency.
///
/// Implemented against the provider integration; mocked in tests.
#[async_trait]
pub trait MentionMonitor: Send + Sync {
    /// Starts watching; the channel closes when monitoring ends.
    ///
    /// # Errors
    ///
    /// Returns a [`SourceCollectionError`] when the monitor cannot be
    /// established.
    async fn watch(
        &self,
        config: &SocialMonitorConfig,
        emergency: &Emergency,
    ) -> Result<mpsc::Receiver<SocialMention>, SourceCollectionError>;
}

/// Evidence source over a social-media monitor.
pub struct SocialMediaSource {
    monitor: Arc<dyn MentionMonitor>,
}

impl SocialMediaSource {
    /// Creates the source over a monitor backend.
    #[must_use]
    pub fn new(monitor: Arc<dyn MentionMonitor>) -> Self {
        Self { monitor }
    }
}

#[async_trait]
impl EvidenceSource for SocialMediaSource {
    fn name(&self) -> &str {
        "social_media_monitor"
    }

    fn category(&self) -> EvidenceCategory {
        EvidenceCategory::SocialMedia
    }

    async fn collect(
        &self,
        emergency: &Emergency,
        sink: EvidenceSink,
    ) -> Result<(), SourceCollectionError> {
        let config = SocialMonitorConfig::for_emergency(emergency);
        let mut mentions = self.monitor.watch(&config, emergency).await?;
        while let Some(mention) = mentions.recv().await {
            let payload = json!({
                "handle": mention.handle,
                "text": mention.text,
                "posted_at": mention.posted_at,
            });
            let evidence = Evidence::new(
                EvidenceCategory::SocialMedia,
                TrustContribution::new(mention.credibility),
                payload,
                self.name(),
            );
            if sink.publish(evidence).await.is_err() {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_keywords_follow_the_emergency_kind() {
        let fire = keywords_for(EmergencyKind::Fire);
        assert!(fire.contains(&"fire".to_string()));
        assert!(fire.contains(&"emergency".to_string()));

        let other = keywords_for(EmergencyKind::Other);
        assert_eq!(other, vec!["emergency".to_string()]);
    }

    #[test]
    fn test_monitor_config_uses_default_radius() {
        let emergency = Emergency::new(
            EmergencyKind::Crime,
            beacon_core::emergency::GeoPoint::new(0.0, 0.0),
        );
        let config = SocialMonitorConfig::for_emergency(&emergency);
        assert_eq!(config.radius_m, DEFAULT_MONITOR_RADIUS_M);
        assert!(config.keywords.contains(&"police".to_string()));
    }
}
