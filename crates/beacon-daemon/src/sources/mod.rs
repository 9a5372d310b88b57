//! Evidence sources and the per-session publication sink.
//!
//! Each source adapter bridges one external backend (a report feed, a
//! social-media monitor, a device scanner, official channels) to the
//! validation pipeline. Sources publish into an [`EvidenceSink`] that is
//! bound to exactly one session's channel, so routing is structural: a
//! source physically cannot deliver evidence to the wrong session, and no
//! id-based filtering on a shared bus is involved.
//!
//! A source failing is an isolated event. The collection task logs the
//! error and the session proceeds on whatever evidence the other sources
//! materialize.

pub mod crowd;
pub mod device;
pub mod official;
pub mod scripted;
pub mod social;

use async_trait::async_trait;
use beacon_core::emergency::Emergency;
use beacon_core::evidence::{Evidence, EvidenceCategory};
use thiserror::Error;
use tokio::sync::{mpsc, watch};

pub use crowd::CrowdReportSource;
pub use device::NearbyDeviceSource;
pub use official::OfficialChannelSource;
pub use scripted::ScriptedSource;
pub use social::SocialMediaSource;

/// The session stopped accepting evidence (finalized and drained, or the
/// coordinator went away). Not an error condition for a source; collection
/// simply ends.
#[derive(Debug, Error)]
#[error("validation session is no longer accepting evidence")]
pub struct SinkClosed;

/// Errors from one source's collection attempt.
///
/// Isolated to the failing source: the coordinator logs it and the session
/// proceeds without further evidence from that source.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SourceCollectionError {
    /// The external backend failed.
    #[error("evidence backend failed: {message}")]
    Backend {
        /// Backend-supplied failure description.
        message: String,
    },

    /// The backend refused or dropped the subscription.
    #[error("evidence subscription failed: {message}")]
    Subscription {
        /// Backend-supplied failure description.
        message: String,
    },
}

impl SourceCollectionError {
    /// Convenience constructor for backend failures.
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

/// Per-session evidence publication handle.
///
/// Clones share the same session channel. Publishing observes the session's
/// done flag so long-running backends stop promptly once the session is
/// finalized and its audit drain has completed.
#[derive(Debug, Clone)]
pub struct EvidenceSink {
    tx: mpsc::Sender<Evidence>,
    done: watch::Receiver<bool>,
}

impl EvidenceSink {
    pub(crate) fn new(tx: mpsc::Sender<Evidence>, done: watch::Receiver<bool>) -> Self {
        Self { tx, done }
    }

    /// Publishes one evidence item into the session.
    ///
    /// # Errors
    ///
    /// Returns [`SinkClosed`] once the session stops accepting evidence;
    /// the source should end collection.
    pub async fn publish(&self, evidence: Evidence) -> Result<(), SinkClosed> {
        if *self.done.borrow() {
            return Err(SinkClosed);
        }
        self.tx.send(evidence).await.map_err(|_| SinkClosed)
    }

    /// Returns `true` once the session stops accepting evidence.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        *self.done.borrow() || self.tx.is_closed()
    }
}

/// An asynchronous producer of evidence for one category.
///
/// One instance per category is registered with the coordinator; `collect`
/// is invoked once per session and may publish zero, one, or many items, at
/// any time, in any order. Implementations must not assume the session is
/// still pending when they publish.
#[async_trait]
pub trait EvidenceSource: Send + Sync {
    /// Stable adapter name, used in logs and evidence audit records.
    fn name(&self) -> &str;

    /// The category this source contributes to.
    fn category(&self) -> EvidenceCategory;

    /// Collects evidence for `emergency`, publishing into `sink` as items
    /// become available. Returns when the backend is exhausted or the sink
    /// closes.
    ///
    /// # Errors
    ///
    /// Returns a [`SourceCollectionError`] when the backend fails; the
    /// coordinator logs it and the session proceeds without this source.
    async fn collect(
        &self,
        emergency: &Emergency,
        sink: EvidenceSink,
    ) -> Result<(), SourceCollectionError>;
}
