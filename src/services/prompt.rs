//! Prompt Assembly
//!
//! Mechanical envelope for the provider request: the two input texts plus a
//! strict JSON-output contract matching the `AnalysisResult` shape. The
//! analytical instruction wording itself is presentation-owned and kept
//! deliberately minimal here.

/// Render the analysis prompt for the generative provider.
pub fn build_analysis_prompt(source_text: &str, evidence_text: &str) -> String {
    format!(
        "Analyze the coverage of the requirements below against the provided evidence.\n\
         Respond with a single JSON object and nothing else, shaped as:\n\
         {{\"summary\": {{\"requirementsTotal\": n, \"covered\": n, \"partial\": n, \"missing\": n, \
         \"coveragePercent\": n, \"proofPercent\": 0, \"risks\": [], \"nextActions\": []}}, \
         \"rows\": [{{\"id\": \"R-001\", \"category\": \"...\", \"status\": \"Covered|Partial|Missing\", \
         \"responseSummary\": \"...\", \"evidenceIds\": [], \"evidenceQuotes\": [], \
         \"gapsOrQuestions\": [], \"riskFlags\": []}}]}}\n\
         Every evidenceQuotes entry must be copied verbatim from the evidence.\n\n\
         === REQUIREMENTS ===\n{source_text}\n\n\
         === EVIDENCE ===\n{evidence_text}\n"
    )
}
