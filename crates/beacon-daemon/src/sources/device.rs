//! Nearby-device source.
//!
//! A scanner backend surfaces devices observed around the emergency
//! location. Sightings are deduplicated by device id within the session,
//! and only devices that can actually answer a validation request produce
//! evidence; passive sightings are counted but contribute nothing.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use beacon_core::emergency::Emergency;
use beacon_core::evidence::{Evidence, EvidenceCategory, TrustContribution};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::debug;

use super::{EvidenceSink, EvidenceSource, SourceCollectionError};

/// One device observed near the emergency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSighting {
    /// Stable device identifier.
    pub device_id: String,
    /// Whether the device can answer a validation request.
    pub can_validate: bool,
    /// Validation confidence in `[0, 1]` reported by the device.
    pub confidence: f64,
}

/// Scans for devices around an emergency.
///
/// Implemented by the device-registry integration; mocked in tests.
#[async_trait]
pub trait DeviceScanner: Send + Sync {
    /// Starts a scan; the channel closes when the scan window ends.
    ///
    /// # Errors
    ///
    /// Returns a [`SourceCollectionError`] when the scan cannot start.
    async fn scan(
        &self,
        emergency: &Emergency,
    ) -> Result<mpsc::Receiver<DeviceSighting>, SourceCollectionError>;
}

/// Evidence source over a device scanner.
pub struct NearbyDeviceSource {
    scanner: Arc<dyn DeviceScanner>,
}

impl NearbyDeviceSource {
    /// Creates the source over a scanner backend.
    #[must_use]
    pub fn new(scanner: Arc<dyn DeviceScanner>) -> Self {
        Self { scanner }
    }
}

#[async_trait]
impl EvidenceSource for NearbyDeviceSource {
    fn name(&self) -> &str {
        "nearby_devices"
    }

    fn category(&self) -> EvidenceCategory {
        EvidenceCategory::NearbyDevice
    }

    async fn collect(
        &self,
        emergency: &Emergency,
        sink: EvidenceSink,
    ) -> Result<(), SourceCollectionError> {
        let mut sightings = self.scanner.scan(emergency).await?;
        let mut seen: HashSet<String> = HashSet::new();
        while let Some(sighting) = sightings.recv().await {
            if !seen.insert(sighting.device_id.clone()) {
                continue;
            }
            if !sighting.can_validate {
                debug!(
                    device = %sighting.device_id,
                    emergency = %emergency.id,
                    "device cannot validate; sighting recorded without evidence"
                );
                continue;
            }
            let payload = json!({ "device_id": sighting.device_id });
            let evidence = Evidence::new(
                EvidenceCategory::NearbyDevice,
                TrustContribution::new(sighting.confidence),
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
    use beacon_core::emergency::{EmergencyKind, GeoPoint};
    use tokio::sync::watch;

    use super::*;

    struct FixedScanner {
        sightings: Vec<DeviceSighting>,
    }

    #[async_trait]
    impl DeviceScanner for FixedScanner {
        async fn scan(
            &self,
            _emergency: &Emergency,
        ) -> Result<mpsc::Receiver<DeviceSighting>, SourceCollectionError> {
            let (tx, rx) = mpsc::channel(16);
            for sighting in self.sightings.clone() {
                tx.send(sighting).await.map_err(|_| {
                    SourceCollectionError::backend("scan channel closed early")
                })?;
            }
            Ok(rx)
        }
    }

    fn sighting(device_id: &str, can_validate: bool) -> DeviceSighting {
        DeviceSighting {
            device_id: device_id.to_string(),
            can_validate,
            confidence: 0.7,
        }
    }

    #[tokio::test]
    async fn test_sightings_are_deduplicated_and_filtered() {
        let scanner = FixedScanner {
            sightings: vec![
                sighting("dev-a", true),
                sighting("dev-a", true),
                sighting("dev-b", false),
                sighting("dev-c", true),
            ],
        };
        let source = NearbyDeviceSource::new(Arc::new(scanner));
        let emergency = Emergency::new(EmergencyKind::Sos, GeoPoint::new(0.0, 0.0));

        let (tx, mut rx) = mpsc::channel(16);
        let (_done_tx, done_rx) = watch::channel(false);
        source
            .collect(&emergency, EvidenceSink::new(tx, done_rx))
            .await
            .unwrap();

        let mut published = Vec::new();
        while let Ok(evidence) = rx.try_recv() {
            published.push(evidence);
        }
        // dev-a once (dedup), dev-b filtered, dev-c once.
        assert_eq!(published.len(), 2);
        assert!(published
            .iter()
            .all(|e| e.category == EvidenceCategory::NearbyDevice));
    }
}
