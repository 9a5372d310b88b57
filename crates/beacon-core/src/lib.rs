//! beacon-core - Crowd validation domain types and state machines.
//!
//! This crate holds the pure, runtime-free half of the crowd-sourced
//! emergency validation subsystem: evidence modeling, composite trust
//! scoring, the per-emergency validation session state machine, and the
//! configuration surface. Everything here is deterministic and
//! side-effect free; the async fan-out/fan-in machinery lives in
//! `beacon-daemon`.
//!
//! # Modules
//!
//! - [`config`]: `ValidationConfig` parsing and fail-closed validation
//! - [`emergency`]: immutable emergency descriptors referenced by id
//! - [`escalation`]: response priority and escalation tiers derived from the
//!   final trust score
//! - [`evidence`]: evidence items, categories, and the append-only
//!   per-session ledger
//! - [`scoring`]: static category weights and the composite trust scorer
//! - [`session`]: the `pending -> terminal` validation session state machine
//!   with its atomic exactly-once finalize discipline

pub mod config;
pub mod emergency;
pub mod escalation;
pub mod evidence;
pub mod scoring;
pub mod session;

pub use config::ValidationConfig;
pub use emergency::{Emergency, EmergencyId, EmergencyKind, GeoPoint};
pub use escalation::{EscalationTier, ResponsePriority};
pub use evidence::{Evidence, EvidenceCategory, EvidenceLedger, TrustContribution};
pub use scoring::{TrustScorer, TrustWeights};
pub use session::{FinalOutcome, ValidationSession, ValidationStatus};
