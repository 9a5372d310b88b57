//! Unit tests for evidence items and the append-only ledger.

use serde_json::json;

use super::*;

fn item(category: EvidenceCategory, trust: f64) -> Evidence {
    Evidence::new(
        category,
        TrustContribution::new(trust),
        json!({}),
        "test_source",
    )
}

#[test]
fn test_category_parse_roundtrip() {
    for category in EvidenceCategory::all() {
        let parsed = EvidenceCategory::parse(category.as_str()).unwrap();
        assert_eq!(*category, parsed);
    }
}

#[test]
fn test_category_parse_unknown_fails() {
    assert!(matches!(
        EvidenceCategory::parse("garbage"),
        Err(EvidenceError::InvalidCategory { .. })
    ));
    assert!(matches!(
        EvidenceCategory::parse(""),
        Err(EvidenceError::InvalidCategory { .. })
    ));
    // Uppercase is not accepted; the wire form is snake_case only.
    assert!(EvidenceCategory::parse("CROWD_REPORT").is_err());
}

#[test]
fn test_category_all_is_exhaustive() {
    assert_eq!(EvidenceCategory::all().len(), 5);
}

#[test]
fn test_trust_contribution_clamps() {
    assert!((TrustContribution::new(1.7).value() - 1.0).abs() < f64::EPSILON);
    assert!(TrustContribution::new(-0.3).value().abs() < f64::EPSILON);
    assert!((TrustContribution::new(0.42).value() - 0.42).abs() < f64::EPSILON);
}

#[test]
fn test_trust_contribution_deserialize_clamps() {
    let trust: TrustContribution = serde_json::from_str("3.5").unwrap();
    assert!((trust.value() - 1.0).abs() < f64::EPSILON);
}

#[test]
fn test_ledger_appends_in_arrival_order() {
    let mut ledger = EvidenceLedger::new();
    ledger.append(item(EvidenceCategory::CrowdReport, 0.9)).unwrap();
    ledger.append(item(EvidenceCategory::CrowdReport, 0.8)).unwrap();
    ledger.append(item(EvidenceCategory::OfficialSource, 0.95)).unwrap();

    let crowd = ledger.items(EvidenceCategory::CrowdReport);
    assert_eq!(crowd.len(), 2);
    assert!((crowd[0].trust.value() - 0.9).abs() < f64::EPSILON);
    assert!((crowd[1].trust.value() - 0.8).abs() < f64::EPSILON);
    assert_eq!(ledger.len(), 3);
    assert!(!ledger.is_empty());
}

#[test]
fn test_ledger_empty_category_yields_empty_slice() {
    let ledger = EvidenceLedger::new();
    assert!(ledger.items(EvidenceCategory::SocialMedia).is_empty());
    assert_eq!(ledger.category_len(EvidenceCategory::SocialMedia), 0);
    assert!(ledger.is_empty());
}

#[test]
fn test_ledger_rejects_overflow() {
    let mut ledger = EvidenceLedger::new();
    for _ in 0..MAX_EVIDENCE_PER_CATEGORY {
        ledger.append(item(EvidenceCategory::NearbyDevice, 0.5)).unwrap();
    }
    let overflow = ledger.append(item(EvidenceCategory::NearbyDevice, 0.5));
    assert!(matches!(
        overflow,
        Err(EvidenceError::LedgerFull {
            category: EvidenceCategory::NearbyDevice,
            capacity: MAX_EVIDENCE_PER_CATEGORY,
        })
    ));
    // Other categories are unaffected by the overflow.
    ledger.append(item(EvidenceCategory::CrowdReport, 0.5)).unwrap();
}
