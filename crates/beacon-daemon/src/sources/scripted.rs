//! Scripted evidence source.
//!
//! Emits a fixed sequence of evidence items after per-item delays. Backs
//! the replay binary and the integration tests, where real feeds are out
//! of reach and deterministic timing matters.

use async_trait::async_trait;
use beacon_core::emergency::Emergency;
use beacon_core::evidence::{Evidence, EvidenceCategory, TrustContribution};
use serde_json::json;
use std::time::Duration;
use tokio::time::sleep;

use super::{EvidenceSink, EvidenceSource, SourceCollectionError};

/// One scripted emission.
#[derive(Debug, Clone)]
pub struct ScriptedEmission {
    /// Delay from the previous emission (the first is from collection
    /// start).
    pub delay: Duration,
    /// Trust contribution of the emitted item.
    pub trust: f64,
    /// Payload attached to the emitted item.
    pub payload: serde_json::Value,
}

/// A deterministic evidence source driven by a fixed script.
pub struct ScriptedSource {
    name: String,
    category: EvidenceCategory,
    emissions: Vec<ScriptedEmission>,
}

impl ScriptedSource {
    /// Creates an empty scripted source.
    #[must_use]
    pub fn new(name: impl Into<String>, category: EvidenceCategory) -> Self {
        Self {
            name: name.into(),
            category,
            emissions: Vec::new(),
        }
    }

    /// Appends an emission with an empty payload.
    #[must_use]
    pub fn emit_after(self, delay: Duration, trust: f64) -> Self {
        self.emit_after_with(delay, trust, json!({}))
    }

    /// Appends an emission with a payload.
    #[must_use]
    pub fn emit_after_with(
        mut self,
        delay: Duration,
        trust: f64,
        payload: serde_json::Value,
    ) -> Self {
        self.emissions.push(ScriptedEmission {
            delay,
            trust,
            payload,
        });
        self
    }
}

#[async_trait]
impl EvidenceSource for ScriptedSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn category(&self) -> EvidenceCategory {
        self.category
    }

    async fn collect(
        &self,
        _emergency: &Emergency,
        sink: EvidenceSink,
    ) -> Result<(), SourceCollectionError> {
        for emission in &self.emissions {
            sleep(emission.delay).await;
            let evidence = Evidence::new(
                self.category,
                TrustContribution::new(emission.trust),
                emission.payload.clone(),
                self.name.clone(),
            );
            if sink.publish(evidence).await.is_err() {
                break;
            }
        }
        Ok(())
    }
}
