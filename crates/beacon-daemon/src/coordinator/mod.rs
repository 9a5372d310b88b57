//! Validation coordination.
//!
//! The coordinator owns the set of active validation sessions. For each
//! initiated emergency it spawns one collection task per registered
//! evidence source, all publishing into the session's own channel, and one
//! driver task that races the evidence fan-in against the session deadline
//! and a done signal. Whichever path wins the session's terminal
//! compare-and-set runs the finalize effect exactly once: persist the
//! terminal status, evict the session from the active set, notify
//! downstream.
//!
//! # Failure Isolation
//!
//! - A source task failing is logged and contributes nothing further; the
//!   session proceeds on whatever evidence materialized.
//! - A persistence failure is logged and never blocks notification or
//!   reverts the in-memory terminal state.
//! - Sessions are independent: nothing in one session's tasks touches
//!   another session's state beyond the registry map.

use std::collections::HashMap;
use std::sync::Arc;

use beacon_core::config::{ConfigError, ValidationConfig};
use beacon_core::emergency::{Emergency, EmergencyId};
use beacon_core::evidence::Evidence;
use beacon_core::scoring::TrustScorer;
use beacon_core::session::{EvidenceDisposition, FinalOutcome, ValidationSession, ValidationStatus};
use thiserror::Error;
use tokio::sync::{RwLock, mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, error, info, trace, warn};

use crate::gateway::{NotificationGateway, PersistenceGateway, ValidationNotice};
use crate::sources::{EvidenceSink, EvidenceSource};

/// Buffered evidence per session channel.
///
/// Sources block (briefly) when the driver lags this far behind; evidence
/// is never dropped.
const EVIDENCE_CHANNEL_CAPACITY: usize = 256;

/// Errors from coordinator operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CoordinatorError {
    /// No active session exists for the emergency (never started, or
    /// already finalized and evicted). Safe to ignore in steady state.
    #[error("no active validation session for emergency {emergency_id}")]
    UnknownEmergency {
        /// The emergency without a session.
        emergency_id: EmergencyId,
    },

    /// A session for this emergency is already running.
    #[error("validation already active for emergency {emergency_id}")]
    AlreadyActive {
        /// The emergency with a live session.
        emergency_id: EmergencyId,
    },

    /// The supplied configuration failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A live session in the registry.
struct ActiveSession {
    session: Arc<ValidationSession>,
    done_tx: watch::Sender<bool>,
}

/// Handle returned by [`ValidationCoordinator::initiate`].
///
/// Holds the session for observation; dropping the handle does not affect
/// the session.
#[derive(Debug)]
pub struct SessionHandle {
    session: Arc<ValidationSession>,
    done: watch::Receiver<bool>,
}

impl SessionHandle {
    /// The emergency under validation.
    #[must_use]
    pub fn emergency_id(&self) -> EmergencyId {
        self.session.emergency_id()
    }

    /// Current session status.
    #[must_use]
    pub fn status(&self) -> ValidationStatus {
        self.session.status()
    }

    /// Current composite score.
    #[must_use]
    pub fn current_score(&self) -> f64 {
        self.session.current_score()
    }

    /// Total evidence recorded so far, audit arrivals included.
    #[must_use]
    pub fn evidence_count(&self) -> usize {
        self.session.evidence_count()
    }

    /// Waits until the session has been finalized and evicted.
    pub async fn finished(&mut self) {
        loop {
            if *self.done.borrow_and_update() {
                return;
            }
            if self.done.changed().await.is_err() {
                return;
            }
        }
    }
}

/// Coordinates crowd validation across all active emergencies.
///
/// Constructed once with its configuration, sources, and gateways; no
/// ambient global state. Shared as an `Arc` with the tasks it spawns.
pub struct ValidationCoordinator {
    config: ValidationConfig,
    scorer: TrustScorer,
    sources: Vec<Arc<dyn EvidenceSource>>,
    persistence: Arc<dyn PersistenceGateway>,
    notifier: Arc<dyn NotificationGateway>,
    active: RwLock<HashMap<EmergencyId, ActiveSession>>,
}

impl ValidationCoordinator {
    /// Creates a coordinator after validating the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Config`] when the configuration or the
    /// trust weights fail validation.
    pub fn new(
        config: ValidationConfig,
        sources: Vec<Arc<dyn EvidenceSource>>,
        persistence: Arc<dyn PersistenceGateway>,
        notifier: Arc<dyn NotificationGateway>,
    ) -> Result<Arc<Self>, CoordinatorError> {
        config.validate()?;
        let scorer = TrustScorer::new(config.trust_weights).map_err(ConfigError::from)?;
        Ok(Arc::new(Self {
            config,
            scorer,
            sources,
            persistence,
            notifier,
            active: RwLock::new(HashMap::new()),
        }))
    }

    /// The configuration this coordinator was constructed with.
    #[must_use]
    pub const fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Number of currently active sessions.
    pub async fn active_sessions(&self) -> usize {
        self.active.read().await.len()
    }

    /// Starts validation for an emergency.
    ///
    /// Creates the session, spawns one collection task per registered
    /// source and a driver task racing the deadline, and returns a handle
    /// for observation.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::AlreadyActive`] when a session for this
    /// emergency is already running.
    pub async fn initiate(
        self: &Arc<Self>,
        emergency: Emergency,
    ) -> Result<SessionHandle, CoordinatorError> {
        let session = Arc::new(ValidationSession::new(
            emergency.id,
            self.config.validation_threshold,
            self.scorer.clone(),
            self.config.max_wait(),
        ));
        let (done_tx, done_rx) = watch::channel(false);

        {
            let mut active = self.active.write().await;
            if active.contains_key(&emergency.id) {
                return Err(CoordinatorError::AlreadyActive {
                    emergency_id: emergency.id,
                });
            }
            active.insert(
                emergency.id,
                ActiveSession {
                    session: Arc::clone(&session),
                    done_tx,
                },
            );
        }

        // The deadline is fixed now; evidence arrival never resets it.
        let deadline = Instant::now() + self.config.max_wait();
        let (evidence_tx, evidence_rx) = mpsc::channel(EVIDENCE_CHANNEL_CAPACITY);

        for source in &self.sources {
            let source = Arc::clone(source);
            let sink = EvidenceSink::new(evidence_tx.clone(), done_rx.clone());
            let emergency = emergency.clone();
            tokio::spawn(async move {
                debug!(
                    source = source.name(),
                    category = %source.category(),
                    emergency = %emergency.id,
                    "evidence collection started"
                );
                if let Err(error) = source.collect(&emergency, sink).await {
                    warn!(
                        source = source.name(),
                        emergency = %emergency.id,
                        %error,
                        "evidence source failed; session proceeds without it"
                    );
                }
            });
        }
        // The driver's channel closes once every source task is done.
        drop(evidence_tx);

        let coordinator = Arc::clone(self);
        let driver_session = Arc::clone(&session);
        let driver_done = done_rx.clone();
        tokio::spawn(async move {
            coordinator
                .drive(driver_session, evidence_rx, deadline, driver_done)
                .await;
        });

        info!(
            emergency = %emergency.id,
            kind = %emergency.kind,
            sources = self.sources.len(),
            max_wait_ms = self.config.max_validation_wait_ms,
            "validation session started"
        );
        Ok(SessionHandle {
            session,
            done: done_rx,
        })
    }

    /// Cancels validation for an emergency resolved by an external actor.
    ///
    /// Transitions a pending session to [`ValidationStatus::Cancelled`] and
    /// finalizes it, with the same exactly-once guarantee as the other
    /// paths. Cancelling a session that already finalized in the meantime
    /// is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::UnknownEmergency`] when no active
    /// session exists for the emergency.
    pub async fn cancel(&self, emergency_id: EmergencyId) -> Result<(), CoordinatorError> {
        let session = self
            .active
            .read()
            .await
            .get(&emergency_id)
            .map(|active| Arc::clone(&active.session))
            .ok_or(CoordinatorError::UnknownEmergency { emergency_id })?;

        if let Some(outcome) = session.cancel() {
            info!(emergency = %emergency_id, "validation cancelled by external resolution");
            self.finalize(&session, outcome).await;
        } else {
            debug!(
                emergency = %emergency_id,
                status = %session.status(),
                "cancel after terminal state; ignoring"
            );
        }
        Ok(())
    }

    /// Routes an out-of-band evidence item to the active session for an
    /// emergency.
    ///
    /// Most evidence flows through the source tasks; this entry point
    /// serves callers outside the registered sources (operator input,
    /// replayed reports). The item participates in scoring exactly like
    /// source-delivered evidence, including winning the threshold
    /// crossing.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::UnknownEmergency`] when no active
    /// session exists (never started, or already finalized and evicted);
    /// steady-state callers treat that as a no-op.
    pub async fn submit_evidence(
        &self,
        emergency_id: EmergencyId,
        evidence: Evidence,
    ) -> Result<(), CoordinatorError> {
        let session = self
            .active
            .read()
            .await
            .get(&emergency_id)
            .map(|active| Arc::clone(&active.session))
            .ok_or(CoordinatorError::UnknownEmergency { emergency_id })?;

        if let Some(outcome) = self.apply_evidence(&session, evidence) {
            self.finalize(&session, outcome).await;
        }
        Ok(())
    }

    /// Per-session driver: applies evidence as it arrives and races the
    /// deadline. Exactly one of the three paths (threshold, deadline,
    /// external cancel) wins the terminal transition.
    async fn drive(
        self: Arc<Self>,
        session: Arc<ValidationSession>,
        mut evidence_rx: mpsc::Receiver<Evidence>,
        deadline: Instant,
        mut done: watch::Receiver<bool>,
    ) {
        let mut sources_exhausted = false;
        loop {
            tokio::select! {
                () = tokio::time::sleep_until(deadline) => {
                    if let Some(outcome) = session.force_expire() {
                        debug!(
                            emergency = %session.emergency_id(),
                            score = outcome.score,
                            "deadline elapsed below threshold"
                        );
                        self.finalize(&session, outcome).await;
                    }
                    break;
                }
                changed = done.changed() => {
                    // Finalized through another path (external cancel), or
                    // the registry entry is gone; either way this driver is
                    // done.
                    if changed.is_err() || *done.borrow() {
                        break;
                    }
                }
                item = evidence_rx.recv(), if !sources_exhausted => {
                    match item {
                        Some(evidence) => {
                            if let Some(outcome) = self.apply_evidence(&session, evidence) {
                                self.finalize(&session, outcome).await;
                                break;
                            }
                        },
                        None => {
                            // All source tasks finished; only the deadline
                            // or a cancel can end the session now.
                            sources_exhausted = true;
                        },
                    }
                }
            }
        }

        // Audit drain: stragglers are still recorded, with no status
        // effect, until every sink is gone.
        tokio::spawn(async move {
            while let Some(evidence) = evidence_rx.recv().await {
                match session.add_evidence(evidence) {
                    Ok(_) => debug!(
                        emergency = %session.emergency_id(),
                        "late evidence recorded for audit"
                    ),
                    Err(error) => warn!(
                        emergency = %session.emergency_id(),
                        %error,
                        "late evidence rejected"
                    ),
                }
            }
        });
    }

    /// Applies one evidence arrival; returns the outcome if it won the
    /// terminal transition.
    fn apply_evidence(
        &self,
        session: &ValidationSession,
        evidence: Evidence,
    ) -> Option<FinalOutcome> {
        let source = evidence.source.clone();
        match session.add_evidence(evidence) {
            Ok(EvidenceDisposition::CrossedThreshold(outcome)) => {
                debug!(
                    emergency = %session.emergency_id(),
                    score = outcome.score,
                    "trust score crossed the validation threshold"
                );
                Some(outcome)
            },
            Ok(EvidenceDisposition::Scored { score }) => {
                trace!(
                    emergency = %session.emergency_id(),
                    %source,
                    score,
                    "evidence recorded"
                );
                None
            },
            Ok(EvidenceDisposition::AuditOnly { status }) => {
                debug!(
                    emergency = %session.emergency_id(),
                    %source,
                    %status,
                    "evidence recorded after terminal state"
                );
                None
            },
            Err(error) => {
                warn!(
                    emergency = %session.emergency_id(),
                    %source,
                    %error,
                    "evidence rejected"
                );
                None
            },
        }
    }

    /// Runs the one-time finalize effect: persist, evict, notify.
    ///
    /// Only ever reached by the winner of the session's terminal
    /// compare-and-set; the claim below turns any bypass into a loud
    /// invariant failure instead of duplicate side effects.
    async fn finalize(&self, session: &ValidationSession, outcome: FinalOutcome) {
        if let Err(error) = session.claim_finalize() {
            error!(%error, "suppressing duplicate finalize side effects");
            debug_assert!(false, "finalize must be claimed exactly once");
            return;
        }

        if let Err(error) = self.persistence.save_final_status(&outcome).await {
            error!(
                emergency = %outcome.emergency_id,
                %error,
                "failed to persist final status; notification proceeds"
            );
        }

        let removed = self.active.write().await.remove(&outcome.emergency_id);

        let notice = ValidationNotice::from_outcome(&outcome);
        info!(
            emergency = %outcome.emergency_id,
            status = %outcome.status,
            score = outcome.score,
            priority = %notice.priority,
            escalation = %notice.escalation,
            "validation finalized"
        );

        if let Some(entry) = removed {
            // Stops the driver and closes every sink for this session.
            let _ = entry.done_tx.send(true);
        }

        self.notifier.notify_validation_result(notice).await;
    }
}
