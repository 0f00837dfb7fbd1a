//! Cache Key Derivation
//!
//! Deterministic fingerprint over the normalized analysis inputs, the
//! requested model, and the logic version. Bumping the logic version is the
//! only sanctioned way to invalidate existing cache entries without deleting
//! files.

use bidproof_core::normalize_for_key;
use sha2::{Digest, Sha256};

/// Field separator inside the digest input, so adjacent fields can never
/// collide by concatenation.
const FIELD_SEP: u8 = 0x1f;

/// Derive the cache key for one analysis request.
///
/// Pure function: equal normalized inputs and logic version always produce
/// the same 64-char hex digest, across processes and restarts.
pub fn derive_cache_key(
    source_text: &str,
    evidence_text: &str,
    model: &str,
    logic_version: &str,
) -> String {
    let mut hasher = Sha256::new();
    for field in [
        normalize_for_key(source_text),
        normalize_for_key(evidence_text),
        model.trim().to_string(),
        logic_version.trim().to_string(),
    ] {
        hasher.update(field.as_bytes());
        hasher.update([FIELD_SEP]);
    }
    format!("{:x}", hasher.finalize())
}
