//! Proof Verifier
//!
//! Checks that every evidence quote claimed by a Covered row is actually
//! locatable in the evidence source text. This module is the only code path
//! that adds the "Evidence mismatch" risk flag; downstream formatting and
//! export code must never recompute it.

use bidproof_core::model::{AnalysisResult, CoverageStatus};
use bidproof_core::normalize_for_proof;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Risk flag attached to rows whose evidence could not be grounded
pub const EVIDENCE_MISMATCH_FLAG: &str = "Evidence mismatch";

/// Aggregate verification outcome
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofReport {
    pub verified_count: usize,
    pub total_evidence_refs: usize,
    pub percent: f64,
    #[serde(default)]
    pub notes: Vec<String>,
}

/// Verify all Covered rows against the evidence source text.
///
/// Mutates `result`: unverifiable rows get the mismatch risk flag, and the
/// summary's proof percentage is updated from the aggregate. Returns the
/// report with per-row notes for anything that failed.
pub fn verify_proof(result: &mut AnalysisResult, evidence_text: &str) -> ProofReport {
    let haystack = normalize_for_proof(evidence_text);

    let mut verified = 0usize;
    let mut total = 0usize;
    let mut notes = Vec::new();

    for row in &mut result.rows {
        if row.status != CoverageStatus::Covered {
            continue;
        }

        let mut row_ok = true;
        for quote in &row.evidence_quotes {
            total += 1;
            if quote_is_grounded(&haystack, quote) {
                verified += 1;
            } else {
                row_ok = false;
                debug!(row = %row.id, "evidence quote not grounded");
                notes.push(format!(
                    "{}: quote not found in evidence: \"{}\"",
                    row.id,
                    preview(quote)
                ));
            }
        }

        if !row_ok && !row.risk_flags.iter().any(|f| f == EVIDENCE_MISMATCH_FLAG) {
            row.risk_flags.push(EVIDENCE_MISMATCH_FLAG.to_string());
        }
    }

    let percent = if total == 0 {
        100.0
    } else {
        (verified as f64 / total as f64 * 1000.0).round() / 10.0
    };
    result.summary.proof_percent = percent;

    ProofReport {
        verified_count: verified,
        total_evidence_refs: total,
        percent,
        notes,
    }
}

/// Matching ladder for one quote against the normalized evidence text:
/// exact substring, then ellipsis fragment matching, then one retry with a
/// single trailing period stripped.
fn quote_is_grounded(haystack: &str, quote: &str) -> bool {
    let needle = normalize_for_proof(quote);
    if needle.is_empty() {
        return false;
    }
    if matches_exact_or_elided(haystack, &needle) {
        return true;
    }
    if let Some(stripped) = needle.strip_suffix('.') {
        let stripped = stripped.trim_end();
        if !stripped.is_empty() && matches_exact_or_elided(haystack, stripped) {
            return true;
        }
    }
    false
}

fn matches_exact_or_elided(haystack: &str, needle: &str) -> bool {
    if haystack.contains(needle) {
        return true;
    }
    if needle.contains("...") || needle.contains('…') {
        return matches_elided(haystack, needle);
    }
    false
}

/// Ellipsis matching: every non-empty fragment must appear in strictly
/// increasing, non-overlapping position order. Each fragment's search starts
/// where the previous fragment ended, so elided middles stay grounded
/// without allowing fabricated ones.
fn matches_elided(haystack: &str, needle: &str) -> bool {
    let fragments: Vec<String> = needle
        .replace('…', "...")
        .split("...")
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .collect();

    if fragments.is_empty() {
        return false;
    }

    let mut search_from = 0usize;
    for fragment in &fragments {
        match haystack[search_from..].find(fragment.as_str()) {
            Some(offset) => {
                search_from += offset + fragment.len();
            }
            None => return false,
        }
    }
    true
}

fn preview(quote: &str) -> String {
    let trimmed = quote.trim();
    if trimmed.chars().count() <= 80 {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(80).collect();
        format!("{cut}…")
    }
}
