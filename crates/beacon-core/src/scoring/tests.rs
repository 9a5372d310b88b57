//! Property and scenario tests for the composite trust scorer.
//!
//! The scenario values pin the deployed policy exactly: averaging within a
//! category means more evidence does not always raise the score, and absent
//! categories keep their full weight out of the sum.

use proptest::prelude::*;
use serde_json::json;

use crate::evidence::{Evidence, EvidenceCategory, EvidenceLedger, TrustContribution};

use super::{TrustScorer, TrustWeights, WeightsError};

const TOLERANCE: f64 = 1e-9;

fn item(category: EvidenceCategory, trust: f64) -> Evidence {
    Evidence::new(category, TrustContribution::new(trust), json!({}), "test")
}

fn ledger_of(items: &[(EvidenceCategory, f64)]) -> EvidenceLedger {
    let mut ledger = EvidenceLedger::new();
    for (category, trust) in items {
        ledger.append(item(*category, *trust)).unwrap();
    }
    ledger
}

fn policy_scorer() -> TrustScorer {
    TrustScorer::new(TrustWeights::SOURCE_POLICY).unwrap()
}

#[test]
fn test_empty_ledger_scores_exactly_zero() {
    let score = policy_scorer().score(&EvidenceLedger::new());
    assert!(score.abs() < f64::EPSILON);
}

#[test]
fn test_scenario_a_partial_evidence_stays_below_threshold() {
    // 2 crowd reports (0.9, 0.8 -> mean 0.85 -> weighted 0.255), 1 media
    // item (0.9 -> 0.225), 1 official bulletin (0.95 -> 0.19). Sum 0.67.
    let ledger = ledger_of(&[
        (EvidenceCategory::CrowdReport, 0.9),
        (EvidenceCategory::CrowdReport, 0.8),
        (EvidenceCategory::MediaEvidence, 0.9),
        (EvidenceCategory::OfficialSource, 0.95),
    ]);
    let score = policy_scorer().score(&ledger);
    assert!((score - 0.67).abs() < TOLERANCE, "got {score}");
    assert!(score < 0.75);
}

#[test]
fn test_scenario_b_additional_evidence_can_lower_the_score() {
    // Scenario A plus a weaker official bulletin (0.9): the official mean
    // drops to 0.925 and the composite falls from 0.67 to 0.665.
    let ledger = ledger_of(&[
        (EvidenceCategory::CrowdReport, 0.9),
        (EvidenceCategory::CrowdReport, 0.8),
        (EvidenceCategory::MediaEvidence, 0.9),
        (EvidenceCategory::OfficialSource, 0.95),
        (EvidenceCategory::OfficialSource, 0.9),
    ]);
    let score = policy_scorer().score(&ledger);
    assert!((score - 0.665).abs() < TOLERANCE, "got {score}");
}

#[test]
fn test_scenario_c_three_perfect_categories_reach_threshold() {
    let ledger = ledger_of(&[
        (EvidenceCategory::CrowdReport, 1.0),
        (EvidenceCategory::MediaEvidence, 1.0),
        (EvidenceCategory::OfficialSource, 1.0),
    ]);
    let score = policy_scorer().score(&ledger);
    assert!((score - 0.75).abs() < TOLERANCE, "got {score}");
}

#[test]
fn test_single_category_cannot_exceed_its_weight() {
    // Three perfect crowd reports cap at the crowd weight: absent
    // categories keep their weight out of the sum.
    let ledger = ledger_of(&[
        (EvidenceCategory::CrowdReport, 1.0),
        (EvidenceCategory::CrowdReport, 1.0),
        (EvidenceCategory::CrowdReport, 1.0),
    ]);
    let score = policy_scorer().score(&ledger);
    assert!((score - 0.30).abs() < TOLERANCE, "got {score}");
}

#[test]
fn test_weights_must_sum_to_one() {
    let weights = TrustWeights {
        crowd_report: 0.5,
        ..TrustWeights::SOURCE_POLICY
    };
    assert!(matches!(
        weights.validate(),
        Err(WeightsError::NotNormalized { .. })
    ));
}

#[test]
fn test_weights_must_be_in_range() {
    let weights = TrustWeights {
        crowd_report: -0.1,
        media_evidence: 0.65,
        ..TrustWeights::SOURCE_POLICY
    };
    assert!(matches!(
        weights.validate(),
        Err(WeightsError::OutOfRange { .. })
    ));
}

fn arb_category() -> impl Strategy<Value = EvidenceCategory> {
    prop_oneof![
        Just(EvidenceCategory::CrowdReport),
        Just(EvidenceCategory::MediaEvidence),
        Just(EvidenceCategory::SocialMedia),
        Just(EvidenceCategory::NearbyDevice),
        Just(EvidenceCategory::OfficialSource),
    ]
}

fn arb_evidence_batch() -> impl Strategy<Value = Vec<(EvidenceCategory, f64)>> {
    prop::collection::vec((arb_category(), 0.0..=1.0f64), 0..64)
}

proptest! {
    /// The composite score never depends on arrival order.
    #[test]
    fn prop_score_is_order_independent(batch in arb_evidence_batch()) {
        let scorer = policy_scorer();
        let forward = scorer.score(&ledger_of(&batch));

        let mut reversed = batch.clone();
        reversed.reverse();
        let backward = scorer.score(&ledger_of(&reversed));

        prop_assert!((forward - backward).abs() < TOLERANCE);
    }

    /// The composite score stays within `[0, 1]`.
    #[test]
    fn prop_score_is_bounded(batch in arb_evidence_batch()) {
        let score = policy_scorer().score(&ledger_of(&batch));
        prop_assert!((0.0..=1.0).contains(&score));
    }

    /// Scoring twice over the same ledger is deterministic.
    #[test]
    fn prop_score_is_deterministic(batch in arb_evidence_batch()) {
        let scorer = policy_scorer();
        let ledger = ledger_of(&batch);
        prop_assert!((scorer.score(&ledger) - scorer.score(&ledger)).abs() < f64::EPSILON);
    }
}
