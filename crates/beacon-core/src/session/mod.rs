//! Validation session lifecycle state machine.
//!
//! One session exists per emergency under validation. Evidence arrives
//! concurrently from any number of source tasks; each arrival is appended to
//! the ledger and, while the session is still pending, the composite score is
//! recomputed. The first caller to observe a threshold crossing (or the
//! deadline/cancellation path) wins an atomic compare-and-set on the status
//! word and becomes the only producer of the session's [`FinalOutcome`].
//!
//! # State Machine
//!
//! ```text
//!                 add_evidence (score < threshold)
//!                     ┌────┐
//!                     ▼    │
//!                 ┌─────────┐  score >= threshold   ┌───────────┐
//!                 │ Pending │──────────────────────►│ Validated │
//!                 └────┬────┘                       └───────────┘
//!                      │ deadline          ┌──────────────┐
//!                      ├──────────────────►│ Insufficient │
//!                      │ cancel            └──────────────┘
//!                      │                   ┌───────────┐
//!                      └──────────────────►│ Cancelled │
//!                                          └───────────┘
//! ```
//!
//! Terminal states absorb every further event: evidence is still appended
//! for audit but can never change the status or produce a second outcome.


use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::emergency::EmergencyId;
use crate::evidence::{Evidence, EvidenceError, EvidenceLedger};
use crate::scoring::TrustScorer;

const STATUS_PENDING: u8 = 0;
const STATUS_VALIDATED: u8 = 1;
const STATUS_INSUFFICIENT: u8 = 2;
const STATUS_CANCELLED: u8 = 3;

/// Lifecycle status of a validation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    /// Evidence is still being collected.
    Pending,
    /// The trust score crossed the validation threshold.
    Validated,
    /// The deadline elapsed below the threshold.
    #[serde(rename = "insufficient_validation")]
    Insufficient,
    /// An external actor resolved the emergency before a decision.
    Cancelled,
}

impl ValidationStatus {
    /// Returns the canonical string representation of this status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Validated => "validated",
            Self::Insufficient => "insufficient_validation",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns `true` for the absorbing states.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    const fn from_code(code: u8) -> Self {
        match code {
            STATUS_VALIDATED => Self::Validated,
            STATUS_INSUFFICIENT => Self::Insufficient,
            STATUS_CANCELLED => Self::Cancelled,
            _ => Self::Pending,
        }
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The one-time result of a finalized session.
///
/// Produced exclusively by the caller that won the terminal status
/// transition; everything downstream (persistence, notification) is driven
/// from this value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalOutcome {
    /// The emergency this session validated.
    pub emergency_id: EmergencyId,
    /// The terminal status.
    pub status: ValidationStatus,
    /// The composite trust score at the moment of the transition.
    pub score: f64,
}

/// What happened to one evidence arrival.
#[derive(Debug)]
pub enum EvidenceDisposition {
    /// Recorded; the session is still pending at the returned score.
    Scored {
        /// Composite score after this item.
        score: f64,
    },
    /// This arrival pushed the score across the threshold and won the
    /// terminal transition. The caller must run the finalize effect.
    CrossedThreshold(FinalOutcome),
    /// Recorded for audit only; the session was already terminal (or lost
    /// the transition race to a concurrent arrival).
    AuditOnly {
        /// The terminal status observed.
        status: ValidationStatus,
    },
}

/// Internal invariant violation: a second caller tried to claim the
/// finalize effect. Impossible by construction while every terminal
/// transition goes through the status compare-and-set.
#[derive(Debug, Error)]
#[error("duplicate finalize attempt for emergency {emergency_id}")]
pub struct DuplicateFinalizeAttempt {
    /// The affected emergency.
    pub emergency_id: EmergencyId,
}

/// Per-emergency validation session.
///
/// Shared across source tasks behind an `Arc`; all mutation goes through
/// the atomic status word and the ledger mutex.
#[derive(Debug)]
pub struct ValidationSession {
    emergency_id: EmergencyId,
    started_at: DateTime<Utc>,
    deadline_at: DateTime<Utc>,
    threshold: f64,
    scorer: TrustScorer,
    ledger: Mutex<EvidenceLedger>,
    status: AtomicU8,
    finalize_claimed: AtomicBool,
}

impl ValidationSession {
    /// Creates a pending session whose deadline is `max_wait` from now.
    #[must_use]
    pub fn new(
        emergency_id: EmergencyId,
        threshold: f64,
        scorer: TrustScorer,
        max_wait: Duration,
    ) -> Self {
        let started_at = Utc::now();
        let wait = i64::try_from(max_wait.as_millis())
            .ok()
            .and_then(TimeDelta::try_milliseconds)
            .unwrap_or(TimeDelta::MAX);
        Self {
            emergency_id,
            started_at,
            deadline_at: started_at.checked_add_signed(wait).unwrap_or(DateTime::<Utc>::MAX_UTC),
            threshold,
            scorer,
            ledger: Mutex::new(EvidenceLedger::new()),
            status: AtomicU8::new(STATUS_PENDING),
            finalize_claimed: AtomicBool::new(false),
        }
    }

    /// The emergency this session belongs to.
    #[must_use]
    pub const fn emergency_id(&self) -> EmergencyId {
        self.emergency_id
    }

    /// When the session was created.
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// The wall-clock deadline. Fixed at creation; never reset by evidence.
    #[must_use]
    pub const fn deadline_at(&self) -> DateTime<Utc> {
        self.deadline_at
    }

    /// The current status. Monotonic: once terminal, never changes.
    #[must_use]
    pub fn status(&self) -> ValidationStatus {
        ValidationStatus::from_code(self.status.load(Ordering::SeqCst))
    }

    /// The composite score derived from the evidence recorded so far.
    #[must_use]
    pub fn current_score(&self) -> f64 {
        self.scorer.score(&self.lock_ledger())
    }

    /// Total evidence items recorded, including audit-only arrivals.
    #[must_use]
    pub fn evidence_count(&self) -> usize {
        self.lock_ledger().len()
    }

    /// Records an evidence arrival.
    ///
    /// The item is appended unconditionally (terminal sessions keep their
    /// audit trail complete). While pending, the composite score is
    /// recomputed; if it reaches the threshold this call races the status
    /// compare-and-set, and the winner receives
    /// [`EvidenceDisposition::CrossedThreshold`] with the session's one and
    /// only [`FinalOutcome`].
    ///
    /// # Errors
    ///
    /// Returns [`EvidenceError::LedgerFull`] when the item's category bound
    /// is exhausted; the session itself is unaffected.
    pub fn add_evidence(&self, evidence: Evidence) -> Result<EvidenceDisposition, EvidenceError> {
        let score = {
            let mut ledger = self.lock_ledger();
            ledger.append(evidence)?;
            if self.status().is_terminal() {
                return Ok(EvidenceDisposition::AuditOnly {
                    status: self.status(),
                });
            }
            self.scorer.score(&ledger)
        };

        if score >= self.threshold {
            if self.transition(STATUS_VALIDATED) {
                return Ok(EvidenceDisposition::CrossedThreshold(FinalOutcome {
                    emergency_id: self.emergency_id,
                    status: ValidationStatus::Validated,
                    score,
                }));
            }
            // Lost the race to a concurrent arrival, the deadline, or a
            // cancellation; the item stays recorded for audit.
            return Ok(EvidenceDisposition::AuditOnly {
                status: self.status(),
            });
        }
        Ok(EvidenceDisposition::Scored { score })
    }

    /// Deadline path: transitions a pending session to
    /// [`ValidationStatus::Insufficient`] regardless of score.
    ///
    /// Returns the [`FinalOutcome`] if this call won the transition, `None`
    /// if the session was already terminal.
    #[must_use]
    pub fn force_expire(&self) -> Option<FinalOutcome> {
        self.transition(STATUS_INSUFFICIENT).then(|| FinalOutcome {
            emergency_id: self.emergency_id,
            status: ValidationStatus::Insufficient,
            score: self.current_score(),
        })
    }

    /// Cancellation path: transitions a pending session to
    /// [`ValidationStatus::Cancelled`].
    ///
    /// Returns the [`FinalOutcome`] if this call won the transition, `None`
    /// if the session was already terminal.
    #[must_use]
    pub fn cancel(&self) -> Option<FinalOutcome> {
        self.transition(STATUS_CANCELLED).then(|| FinalOutcome {
            emergency_id: self.emergency_id,
            status: ValidationStatus::Cancelled,
            score: self.current_score(),
        })
    }

    /// Claims the one-time finalize effect.
    ///
    /// Called by the finalize path before persisting and notifying. The
    /// status compare-and-set already guarantees a single winner, so a
    /// failure here is a programming error, not a business condition.
    ///
    /// # Errors
    ///
    /// Returns [`DuplicateFinalizeAttempt`] if the effect was already
    /// claimed.
    pub fn claim_finalize(&self) -> Result<(), DuplicateFinalizeAttempt> {
        if self
            .finalize_claimed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            Ok(())
        } else {
            Err(DuplicateFinalizeAttempt {
                emergency_id: self.emergency_id,
            })
        }
    }

    /// Attempts the `pending -> terminal` compare-and-set.
    fn transition(&self, to: u8) -> bool {
        self.status
            .compare_exchange(STATUS_PENDING, to, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Locks the ledger, recovering from poisoning.
    ///
    /// Appends and scoring are infallible over the data itself, so a panic
    /// in an unrelated holder never invalidates the ledger contents.
    fn lock_ledger(&self) -> std::sync::MutexGuard<'_, EvidenceLedger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
