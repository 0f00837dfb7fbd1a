//! Proof Verification Integration Tests
//!
//! The evidence grounding ladder: exact substring matching after
//! normalization, ellipsis fragment matching, the trailing-period retry,
//! and the mismatch risk flag contract.

use bidproof::{verify_proof, EVIDENCE_MISMATCH_FLAG};
use bidproof_core::model::CoverageStatus;

use crate::helpers::result_with_row;

const EVIDENCE: &str = "The quick brown fox jumps over the lazy dog. \
Data is replicated across two regions.";

#[test]
fn test_exact_quote_is_verified() {
    let mut result = result_with_row(CoverageStatus::Covered, vec!["jumps over the lazy dog"]);
    let report = verify_proof(&mut result, EVIDENCE);
    assert_eq!(report.verified_count, 1);
    assert_eq!(report.total_evidence_refs, 1);
    assert_eq!(result.summary.proof_percent, 100.0);
    assert!(result.rows[0].risk_flags.is_empty());
}

#[test]
fn test_quote_matching_ignores_case_and_whitespace() {
    let mut result = result_with_row(
        CoverageStatus::Covered,
        vec!["The  QUICK brown\nfox jumps"],
    );
    let report = verify_proof(&mut result, EVIDENCE);
    assert_eq!(report.verified_count, 1);
}

#[test]
fn test_curly_punctuation_is_normalized_before_matching() {
    let evidence = "The vendor\u{2019}s platform is \u{201c}fully managed\u{201d} end to end.";
    let mut result = result_with_row(
        CoverageStatus::Covered,
        vec!["the vendor's platform is \"fully managed\""],
    );
    let report = verify_proof(&mut result, evidence);
    assert_eq!(report.verified_count, 1);
}

#[test]
fn test_elided_quote_with_ordered_fragments_is_verified() {
    let mut result = result_with_row(CoverageStatus::Covered, vec!["The quick ... lazy dog"]);
    let report = verify_proof(&mut result, EVIDENCE);
    assert_eq!(report.verified_count, 1);
    assert!(result.rows[0].risk_flags.is_empty());
}

#[test]
fn test_elided_quote_with_a_missing_fragment_fails() {
    let mut result = result_with_row(CoverageStatus::Covered, vec!["The quick ... purple dog"]);
    let report = verify_proof(&mut result, EVIDENCE);
    assert_eq!(report.verified_count, 0);
    assert_eq!(result.summary.proof_percent, 0.0);
    assert!(result.rows[0]
        .risk_flags
        .iter()
        .any(|f| f == EVIDENCE_MISMATCH_FLAG));
    assert!(!report.notes.is_empty());
}

#[test]
fn test_elided_fragments_must_appear_in_order() {
    let mut result = result_with_row(CoverageStatus::Covered, vec!["lazy dog ... The quick"]);
    let report = verify_proof(&mut result, EVIDENCE);
    assert_eq!(report.verified_count, 0);
}

#[test]
fn test_unicode_ellipsis_is_treated_like_three_dots() {
    let mut result = result_with_row(CoverageStatus::Covered, vec!["The quick \u{2026} lazy dog"]);
    let report = verify_proof(&mut result, EVIDENCE);
    assert_eq!(report.verified_count, 1);
}

#[test]
fn test_trailing_period_is_stripped_on_retry() {
    // Evidence sentence continues, so the quote's final period never matches
    // verbatim; the retry without it does.
    let evidence = "Backups run nightly and are retained for 30 days under the standard plan.";
    let mut result = result_with_row(
        CoverageStatus::Covered,
        vec!["Backups run nightly and are retained for 30 days."],
    );
    let report = verify_proof(&mut result, evidence);
    assert_eq!(report.verified_count, 1);
}

#[test]
fn test_only_covered_rows_are_checked() {
    let mut result = result_with_row(CoverageStatus::Partial, vec!["no such text anywhere"]);
    let report = verify_proof(&mut result, EVIDENCE);
    assert_eq!(report.total_evidence_refs, 0);
    assert_eq!(result.summary.proof_percent, 100.0);
    assert!(result.rows[0].risk_flags.is_empty());
}

#[test]
fn test_no_evidence_refs_means_full_proof() {
    let mut result = result_with_row(CoverageStatus::Covered, vec![]);
    let report = verify_proof(&mut result, EVIDENCE);
    assert_eq!(report.total_evidence_refs, 0);
    assert_eq!(result.summary.proof_percent, 100.0);
}

#[test]
fn test_mismatch_flag_is_never_duplicated() {
    let mut result = result_with_row(CoverageStatus::Covered, vec!["absent quote"]);
    verify_proof(&mut result, EVIDENCE);
    verify_proof(&mut result, EVIDENCE);
    let flags: Vec<_> = result.rows[0]
        .risk_flags
        .iter()
        .filter(|f| *f == EVIDENCE_MISMATCH_FLAG)
        .collect();
    assert_eq!(flags.len(), 1);
}

#[test]
fn test_mixed_quotes_yield_a_partial_percentage() {
    let mut result = result_with_row(
        CoverageStatus::Covered,
        vec!["quick brown fox", "replicated across two regions", "not in evidence", "also absent"],
    );
    let report = verify_proof(&mut result, EVIDENCE);
    assert_eq!(report.verified_count, 2);
    assert_eq!(report.total_evidence_refs, 4);
    assert_eq!(result.summary.proof_percent, 50.0);
    assert!(result.rows[0]
        .risk_flags
        .iter()
        .any(|f| f == EVIDENCE_MISMATCH_FLAG));
}
