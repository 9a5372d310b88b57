//! Official-channel source.
//!
//! Official channels (emergency services, traffic systems, weather alerts,
//! public-safety feeds) are queried once each, concurrently. A channel
//! either confirms with a bulletin and a confidence, reports nothing, or
//! fails; failures are logged per channel and never affect the others.

use std::sync::Arc;

use async_trait::async_trait;
use beacon_core::emergency::Emergency;
use beacon_core::evidence::{Evidence, EvidenceCategory, TrustContribution};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use super::{EvidenceSink, EvidenceSource, SourceCollectionError};

/// A confirmation published by an official channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfficialBulletin {
    /// Issuing agency.
    pub agency: String,
    /// Confidence in `[0, 1]` that the emergency is genuine.
    pub confidence: f64,
    /// Human-readable summary.
    pub summary: String,
}

/// One official data channel.
///
/// Implemented by the per-agency integrations; mocked in tests.
#[async_trait]
pub trait OfficialChannel: Send + Sync {
    /// The agency this channel queries.
    fn agency(&self) -> &str;

    /// Checks whether the agency has anything on record for `emergency`.
    ///
    /// # Errors
    ///
    /// Returns a [`SourceCollectionError`] when the query fails.
    async fn check(
        &self,
        emergency: &Emergency,
    ) -> Result<Option<OfficialBulletin>, SourceCollectionError>;
}

/// Evidence source fanning out over the registered official channels.
pub struct OfficialChannelSource {
    channels: Vec<Arc<dyn OfficialChannel>>,
}

impl OfficialChannelSource {
    /// Creates the source over a set of channels.
    #[must_use]
    pub fn new(channels: Vec<Arc<dyn OfficialChannel>>) -> Self {
        Self { channels }
    }
}

#[async_trait]
impl EvidenceSource for OfficialChannelSource {
    fn name(&self) -> &str {
        "official_channels"
    }

    fn category(&self) -> EvidenceCategory {
        EvidenceCategory::OfficialSource
    }

    async fn collect(
        &self,
        emergency: &Emergency,
        sink: EvidenceSink,
    ) -> Result<(), SourceCollectionError> {
        let checks = self
            .channels
            .iter()
            .map(|channel| async move { (channel.agency().to_string(), channel.check(emergency).await) });

        for (agency, result) in join_all(checks).await {
            match result {
                Ok(Some(bulletin)) => {
                    let payload = json!({
                        "agency": bulletin.agency,
                        "summary": bulletin.summary,
                    });
                    let evidence = Evidence::new(
                        EvidenceCategory::OfficialSource,
                        TrustContribution::new(bulletin.confidence),
                        payload,
                        self.name(),
                    );
                    if sink.publish(evidence).await.is_err() {
                        break;
                    }
                },
                Ok(None) => {
                    debug!(%agency, emergency = %emergency.id, "no official record");
                },
                Err(error) => {
                    warn!(
                        %agency,
                        emergency = %emergency.id,
                        %error,
                        "official channel failed; continuing with the others"
                    );
                },
            }
        }
        Ok(())
    }
}
