//! beacon-daemon - Async coordination runtime for crowd validation.
//!
//! This crate hosts the concurrent half of the validation subsystem: the
//! coordinator that fans a validation request out to the registered
//! evidence sources, races the per-session deadline against the evidence
//! fan-in, and drives the exactly-once finalize effect (persist, evict,
//! notify).
//!
//! # Runtime Requirements
//!
//! Evidence sources represent genuinely concurrent I/O-bound operations
//! (network calls, device scans) with unpredictable latency; run the
//! coordinator on a **multi-threaded tokio runtime** so arrival order is
//! truly unconstrained, which is what the session state machine is built
//! to withstand.
//!
//! # Modules
//!
//! - [`coordinator`]: active-session registry, fan-out, deadline racing,
//!   cancellation, finalize
//! - [`gateway`]: persistence and notification collaborator traits with
//!   in-memory reference implementations
//! - [`sources`]: the `EvidenceSource` trait, the per-session
//!   `EvidenceSink`, and the source adapters (crowd, social, device,
//!   official, scripted)

pub mod coordinator;
pub mod gateway;
pub mod sources;

pub use coordinator::{CoordinatorError, SessionHandle, ValidationCoordinator};
pub use gateway::{NotificationGateway, PersistenceGateway, ValidationNotice};
pub use sources::{EvidenceSink, EvidenceSource, SourceCollectionError};
