//! Text Normalization
//!
//! Shared normalization rules. Cache keying needs a light touch (line-ending
//! and whitespace stability across platforms); proof verification needs an
//! aggressive canonical form so typographic variation never breaks grounding.

/// Normalize text for cache-key derivation: strip carriage returns and trim.
pub fn normalize_for_key(text: &str) -> String {
    text.replace('\r', "").trim().to_string()
}

/// Normalize text for proof matching.
///
/// Strips carriage returns, unifies curly quotes and long dashes to their
/// ASCII equivalents, collapses whitespace runs to single spaces, case-folds,
/// and trims.
pub fn normalize_for_proof(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = false;
    for ch in text.chars() {
        let mapped = match ch {
            '\r' => continue,
            '\u{2018}' | '\u{2019}' | '\u{201B}' => '\'',
            '\u{201C}' | '\u{201D}' | '\u{201F}' => '"',
            '\u{2013}' | '\u{2014}' | '\u{2212}' => '-',
            '\u{00A0}' => ' ',
            c => c,
        };
        if mapped.is_whitespace() {
            if !last_was_space {
                out.push(' ');
                last_was_space = true;
            }
        } else {
            for lower in mapped.to_lowercase() {
                out.push(lower);
            }
            last_was_space = false;
        }
    }
    out.trim().to_string()
}
