//! beacon-daemon - Crowd validation replay runner.
//!
//! Operational dry-run surface for the validation subsystem: loads a
//! validation configuration and a scenario file describing emergencies
//! with scripted evidence timelines, then runs each scenario through a
//! real coordinator and logs the outcomes. The production ingest surface
//! (HTTP/socket) is a separate concern and not part of this binary.
//!
//! # Scenario Format
//!
//! ```toml
//! [[emergencies]]
//! kind = "fire"
//! latitude = 48.8566
//! longitude = 2.3522
//!
//! [[emergencies.evidence]]
//! category = "crowd_report"
//! trust = 0.9
//! after_ms = 100
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use beacon_core::config::ValidationConfig;
use beacon_core::emergency::{Emergency, EmergencyKind, GeoPoint};
use beacon_core::evidence::EvidenceCategory;
use beacon_daemon::coordinator::ValidationCoordinator;
use beacon_daemon::gateway::{
    InMemoryPersistence, NotificationGateway, PersistenceGateway, RecordingNotifier,
};
use beacon_daemon::sources::{EvidenceSource, ScriptedSource};
use clap::Parser;
use serde::Deserialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug, Parser)]
#[command(name = "beacon-daemon", about = "Crowd validation replay runner")]
struct Args {
    /// Path to a validation config TOML; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to the scenario TOML to replay.
    #[arg(long)]
    scenario: PathBuf,

    /// Log filter, e.g. `info` or `beacon_daemon=debug`.
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// One emergency with its scripted evidence timeline.
#[derive(Debug, Deserialize)]
struct ScenarioEmergency {
    kind: EmergencyKind,
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    evidence: Vec<ScenarioEvidence>,
}

/// One scripted evidence item.
#[derive(Debug, Deserialize)]
struct ScenarioEvidence {
    category: EvidenceCategory,
    trust: f64,
    after_ms: u64,
}

#[derive(Debug, Deserialize)]
struct ScenarioFile {
    #[serde(default)]
    emergencies: Vec<ScenarioEmergency>,
}

/// Builds one scripted source per category appearing in the timeline.
///
/// Per-category delays are relative to collection start, so the absolute
/// `after_ms` offsets are converted to gaps within each category lane.
fn sources_for(scenario: &ScenarioEmergency) -> Vec<Arc<dyn EvidenceSource>> {
    let mut by_category: HashMap<EvidenceCategory, Vec<&ScenarioEvidence>> = HashMap::new();
    for item in &scenario.evidence {
        by_category.entry(item.category).or_default().push(item);
    }

    let mut sources: Vec<Arc<dyn EvidenceSource>> = Vec::new();
    for (category, mut items) in by_category {
        items.sort_by_key(|item| item.after_ms);
        let mut source = ScriptedSource::new(format!("scripted_{category}"), category);
        let mut elapsed = 0;
        for item in items {
            let gap = item.after_ms.saturating_sub(elapsed);
            elapsed = item.after_ms;
            source = source.emit_after(Duration::from_millis(gap), item.trust);
        }
        sources.push(Arc::new(source));
    }
    sources
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match &args.config {
        Some(path) => ValidationConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ValidationConfig::default(),
    };

    let scenario_text = std::fs::read_to_string(&args.scenario)
        .with_context(|| format!("reading scenario from {}", args.scenario.display()))?;
    let scenario: ScenarioFile =
        toml::from_str(&scenario_text).context("parsing scenario file")?;

    if scenario.emergencies.is_empty() {
        warn!("scenario file contains no emergencies; nothing to replay");
        return Ok(());
    }

    info!(
        emergencies = scenario.emergencies.len(),
        threshold = config.validation_threshold,
        max_wait_ms = config.max_validation_wait_ms,
        "replaying scenario"
    );

    for entry in &scenario.emergencies {
        let emergency = Emergency::new(entry.kind, GeoPoint::new(entry.latitude, entry.longitude));
        let persistence = Arc::new(InMemoryPersistence::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let coordinator = ValidationCoordinator::new(
            config.clone(),
            sources_for(entry),
            Arc::clone(&persistence) as Arc<dyn PersistenceGateway>,
            Arc::clone(&notifier) as Arc<dyn NotificationGateway>,
        )?;

        let mut handle = coordinator.initiate(emergency).await?;
        handle.finished().await;

        for notice in notifier.notices().await {
            info!(
                emergency = %notice.emergency_id,
                kind = %entry.kind,
                status = %notice.status,
                score = notice.score,
                priority = %notice.priority,
                escalation = %notice.escalation,
                evidence = handle.evidence_count(),
                "replay outcome"
            );
        }
    }

    Ok(())
}
