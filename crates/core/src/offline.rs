//! Deterministic Offline Analyzer
//!
//! Pure local coverage analysis over the two input texts. Produces the same
//! `AnalysisResult` shape as the generative path so every downstream consumer
//! (verifier, exports, stores) is lane-agnostic. No I/O, no randomness:
//! identical inputs always yield identical output.

use crate::model::{AnalysisResult, AnalysisSummary, CoverageStatus, RequirementRow};

/// Minimum term-overlap ratio for a Covered verdict
const COVERED_THRESHOLD: f64 = 0.6;

/// Minimum term-overlap ratio for a Partial verdict
const PARTIAL_THRESHOLD: f64 = 0.25;

/// Minimum significant-term length
const MIN_TERM_LEN: usize = 4;

/// Words carrying no requirement meaning, excluded from overlap scoring
const STOPWORDS: &[&str] = &[
    "shall", "should", "must", "will", "that", "this", "with", "from", "have", "been", "were",
    "their", "there", "which", "would", "could", "into", "such", "other", "than", "then", "them",
    "these", "those", "when", "where", "each", "also", "able", "upon", "provide", "provided",
    "including", "include", "required", "require", "requirements",
];

/// Keyword buckets for requirement categorization, first match wins
const CATEGORIES: &[(&str, &[&str])] = &[
    ("Security", &["security", "encrypt", "authentication", "access", "audit", "privacy"]),
    ("Performance", &["performance", "latency", "throughput", "response time", "scalab", "uptime", "availability"]),
    ("Integration", &["integrat", "interface", "api", "import", "export", "interoperab"]),
    ("Compliance", &["complian", "regulation", "certif", "standard", "gdpr", "iso", "soc"]),
    ("Delivery", &["deliver", "milestone", "schedule", "timeline", "deadline", "implementation plan"]),
    ("Support", &["support", "maintenance", "training", "warranty", "sla", "helpdesk"]),
];

/// Run the deterministic offline analysis.
///
/// Requirements are extracted from `source_text` (numbered or bulleted lines,
/// or lines carrying modal verbs), scored by significant-term overlap against
/// `evidence_text`, and assigned Covered/Partial/Missing verdicts. Covered
/// rows quote the best-matching evidence sentence verbatim so proof
/// verification can ground them.
pub fn analyze_offline(source_text: &str, evidence_text: &str) -> AnalysisResult {
    let requirements = extract_requirements(source_text);
    let evidence_sentences = split_sentences(evidence_text);
    let evidence_terms: Vec<Vec<String>> = evidence_sentences
        .iter()
        .map(|s| significant_terms(s))
        .collect();

    let mut rows = Vec::with_capacity(requirements.len());
    let mut risks = Vec::new();

    for (idx, requirement) in requirements.iter().enumerate() {
        let id = format!("R-{:03}", idx + 1);
        let terms = significant_terms(requirement);
        let (ratio, best_sentence) = score_against_evidence(&terms, &evidence_terms);

        let status = if terms.is_empty() || ratio >= COVERED_THRESHOLD {
            CoverageStatus::Covered
        } else if ratio >= PARTIAL_THRESHOLD {
            CoverageStatus::Partial
        } else {
            CoverageStatus::Missing
        };

        let mut evidence_ids = Vec::new();
        let mut evidence_quotes = Vec::new();
        let mut gaps_or_questions = Vec::new();

        match status {
            CoverageStatus::Covered => {
                if let Some(sentence_idx) = best_sentence {
                    evidence_ids.push(format!("E{}", sentence_idx + 1));
                    evidence_quotes.push(evidence_sentences[sentence_idx].clone());
                }
            }
            CoverageStatus::Partial => {
                if let Some(sentence_idx) = best_sentence {
                    evidence_ids.push(format!("E{}", sentence_idx + 1));
                }
                gaps_or_questions.push(format!(
                    "Confirm that the existing evidence fully addresses: {}",
                    truncate(requirement, 120)
                ));
            }
            CoverageStatus::Missing => {
                gaps_or_questions.push(format!(
                    "No supporting evidence found for: {}",
                    truncate(requirement, 120)
                ));
                risks.push(format!("{id} has no supporting evidence"));
            }
        }

        rows.push(RequirementRow {
            id,
            category: categorize(requirement),
            status,
            response_summary: summarize(requirement, status),
            evidence_ids,
            evidence_quotes,
            gaps_or_questions,
            risk_flags: Vec::new(),
        });
    }

    let covered = rows
        .iter()
        .filter(|r| r.status == CoverageStatus::Covered)
        .count();
    let partial = rows
        .iter()
        .filter(|r| r.status == CoverageStatus::Partial)
        .count();
    let missing = rows.len() - covered - partial;
    let coverage_percent = if rows.is_empty() {
        0.0
    } else {
        (covered as f64 / rows.len() as f64 * 1000.0).round() / 10.0
    };

    let open_questions: usize = rows.iter().map(|r| r.gaps_or_questions.len()).sum();
    let mut next_actions = Vec::new();
    if missing > 0 {
        next_actions.push(format!(
            "Gather evidence for {missing} requirement(s) with no coverage"
        ));
    }
    if open_questions > 0 {
        next_actions.push(format!("Resolve {open_questions} open clarification question(s)"));
    }
    if next_actions.is_empty() {
        next_actions.push("Review covered requirements and finalize the response".to_string());
    }

    AnalysisResult {
        summary: AnalysisSummary {
            requirements_total: rows.len(),
            covered,
            partial,
            missing,
            coverage_percent,
            proof_percent: 0.0,
            risks,
            next_actions,
        },
        rows,
    }
}

/// Extract requirement statements from the source text.
///
/// Numbered/bulleted lines and lines with modal verbs qualify; if nothing
/// qualifies, every non-trivial line is treated as a requirement so the
/// analyzer never returns an empty result for non-empty input.
fn extract_requirements(source_text: &str) -> Vec<String> {
    let lines: Vec<String> = source_text
        .replace('\r', "")
        .lines()
        .map(str::trim)
        .filter(|l| l.len() > 2)
        .map(|l| strip_list_marker(l).to_string())
        .collect();

    let qualified: Vec<String> = lines
        .iter()
        .filter(|l| looks_like_requirement(l))
        .cloned()
        .collect();

    if qualified.is_empty() {
        lines
    } else {
        qualified
    }
}

fn looks_like_requirement(line: &str) -> bool {
    let lower = line.to_lowercase();
    ["shall", "must", "should", "will", "required", "provide"]
        .iter()
        .any(|kw| {
            lower
                .split(|c: char| !c.is_alphanumeric())
                .any(|word| word == *kw)
        })
}

fn strip_list_marker(line: &str) -> &str {
    let trimmed = line.trim_start_matches(['-', '*', '•', ' ']);
    let without_number = trimmed
        .trim_start_matches(|c: char| c.is_ascii_digit() || c == '.' || c == ')' || c == '(');
    let candidate = without_number.trim_start();
    if candidate.is_empty() {
        line.trim()
    } else {
        candidate
    }
}

/// Split text into trimmed sentences, preserving the original wording so
/// quotes extracted here remain verbatim substrings after CR stripping.
fn split_sentences(text: &str) -> Vec<String> {
    text.replace('\r', "")
        .split_terminator(['.', '!', '?', ';', '\n'])
        .map(str::trim)
        .filter(|s| s.len() > 3)
        .map(str::to_string)
        .collect()
}

fn significant_terms(text: &str) -> Vec<String> {
    let mut terms: Vec<String> = text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() >= MIN_TERM_LEN && !STOPWORDS.contains(w))
        .map(str::to_string)
        .collect();
    terms.sort();
    terms.dedup();
    terms
}

/// Score requirement terms against all evidence sentences.
///
/// Returns the overlap ratio over the whole evidence body and the index of
/// the single best-matching sentence, if any sentence matched at all.
fn score_against_evidence(
    terms: &[String],
    evidence_terms: &[Vec<String>],
) -> (f64, Option<usize>) {
    if terms.is_empty() {
        return (1.0, None);
    }

    let mut matched_anywhere = 0usize;
    for term in terms {
        if evidence_terms.iter().any(|sentence| sentence.contains(term)) {
            matched_anywhere += 1;
        }
    }

    let mut best: Option<(usize, usize)> = None;
    for (idx, sentence) in evidence_terms.iter().enumerate() {
        let matched = terms.iter().filter(|t| sentence.contains(*t)).count();
        if matched > 0 && best.map_or(true, |(_, prev)| matched > prev) {
            best = Some((idx, matched));
        }
    }

    (
        matched_anywhere as f64 / terms.len() as f64,
        best.map(|(idx, _)| idx),
    )
}

fn categorize(requirement: &str) -> String {
    let lower = requirement.to_lowercase();
    for (name, keywords) in CATEGORIES {
        if keywords.iter().any(|kw| lower.contains(kw)) {
            return (*name).to_string();
        }
    }
    "General".to_string()
}

fn summarize(requirement: &str, status: CoverageStatus) -> String {
    let prefix = match status {
        CoverageStatus::Covered => "Addressed by existing evidence",
        CoverageStatus::Partial => "Partially addressed; clarification needed",
        CoverageStatus::Missing => "Not addressed in the available evidence",
    };
    format!("{prefix}: {}", truncate(requirement, 140))
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}…", cut.trim_end())
    }
}
