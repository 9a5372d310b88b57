//! Persistence and notification collaborators.
//!
//! The coordinator decides *what* to record and *whom* to tell; the actual
//! storage engine and delivery channels live behind these traits.
//! Persistence is an at-least-once attempt: a failed save is logged and
//! never rolls back the in-memory terminal state or blocks notification.

use std::collections::HashMap;

use async_trait::async_trait;
use beacon_core::emergency::EmergencyId;
use beacon_core::escalation::{EscalationTier, ResponsePriority};
use beacon_core::session::{FinalOutcome, ValidationStatus};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors from the storage collaborator.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PersistenceError {
    /// The storage backend failed.
    #[error("storage backend failed: {message}")]
    Backend {
        /// Backend-supplied failure description.
        message: String,
    },
}

impl PersistenceError {
    /// Convenience constructor for backend failures.
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

/// What downstream stakeholders receive when a session finalizes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationNotice {
    /// The finalized emergency.
    pub emergency_id: EmergencyId,
    /// Terminal validation status.
    pub status: ValidationStatus,
    /// Final composite trust score.
    pub score: f64,
    /// Dispatch urgency derived from the score.
    pub priority: ResponsePriority,
    /// Severity band derived from the score.
    pub escalation: EscalationTier,
}

impl ValidationNotice {
    /// Builds the notice for a final outcome.
    #[must_use]
    pub fn from_outcome(outcome: &FinalOutcome) -> Self {
        Self {
            emergency_id: outcome.emergency_id,
            status: outcome.status,
            score: outcome.score,
            priority: ResponsePriority::from_score(outcome.score),
            escalation: EscalationTier::from_score(outcome.score),
        }
    }
}

/// Records a session's terminal status and final score.
///
/// Called exactly once per session at finalize.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Saves the terminal status and score for an emergency.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistenceError`] when the backend rejects the write;
    /// the coordinator logs it and proceeds to notification regardless.
    async fn save_final_status(&self, outcome: &FinalOutcome) -> Result<(), PersistenceError>;
}

/// Fans the validation result out to downstream stakeholders.
///
/// Fire-and-forget: the coordinator does not wait for acknowledgment
/// semantics beyond the call itself.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    /// Delivers the finalize notice.
    async fn notify_validation_result(&self, notice: ValidationNotice);
}

/// In-memory persistence, for tests and the replay binary.
#[derive(Debug, Default)]
pub struct InMemoryPersistence {
    records: RwLock<HashMap<EmergencyId, (ValidationStatus, f64)>>,
}

impl InMemoryPersistence {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the saved record for an emergency, if any.
    pub async fn record(&self, emergency_id: EmergencyId) -> Option<(ValidationStatus, f64)> {
        self.records.read().await.get(&emergency_id).copied()
    }

    /// Number of saved records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Returns `true` when nothing has been saved.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl PersistenceGateway for InMemoryPersistence {
    async fn save_final_status(&self, outcome: &FinalOutcome) -> Result<(), PersistenceError> {
        self.records
            .write()
            .await
            .insert(outcome.emergency_id, (outcome.status, outcome.score));
        Ok(())
    }
}

/// Notification gateway that records every notice, for tests and the
/// replay binary.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: RwLock<Vec<ValidationNotice>>,
}

impl RecordingNotifier {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every notice delivered so far.
    pub async fn notices(&self) -> Vec<ValidationNotice> {
        self.notices.read().await.clone()
    }

    /// Number of notices delivered.
    pub async fn len(&self) -> usize {
        self.notices.read().await.len()
    }
}

#[async_trait]
impl NotificationGateway for RecordingNotifier {
    async fn notify_validation_result(&self, notice: ValidationNotice) {
        self.notices.write().await.push(notice);
    }
}
