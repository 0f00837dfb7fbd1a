//! Export Generation
//!
//! Renders the five export artifacts from a finished analysis: proofpack,
//! bidpacket, clarifications email, risks CSV, and proposal draft. Pure
//! string templating over the result and meta; risk flags are read as-is,
//! never recomputed here.

use bidproof_core::model::{AnalysisResult, ExportSet, OrchestratorMeta};

/// Generate the full export set for one run.
pub fn generate_exports(result: &AnalysisResult, meta: &OrchestratorMeta) -> ExportSet {
    ExportSet {
        proofpack: render_proofpack(result, meta),
        bidpacket: render_bidpacket(result),
        clarifications_email: render_clarifications_email(result),
        risks_csv: render_risks_csv(result),
        proposal_draft: render_proposal_draft(result),
    }
}

fn render_proofpack(result: &AnalysisResult, meta: &OrchestratorMeta) -> String {
    let mut out = String::from("# Proofpack\n\n");
    out.push_str(&format!(
        "Lane: {} | Model: {} | Proof: {:.1}%\n\n",
        meta.ladder_used, meta.model_used, result.summary.proof_percent
    ));
    for row in &result.rows {
        out.push_str(&format!("## {} ({})\n\n", row.id, row.status));
        if row.evidence_quotes.is_empty() {
            out.push_str("_No evidence cited._\n\n");
        }
        for (quote, id) in row.evidence_quotes.iter().zip(
            row.evidence_ids
                .iter()
                .map(String::as_str)
                .chain(std::iter::repeat("-")),
        ) {
            out.push_str(&format!("- [{id}] \"{quote}\"\n"));
        }
        if !row.risk_flags.is_empty() {
            out.push_str(&format!("\nRisk flags: {}\n", row.risk_flags.join(", ")));
        }
        out.push('\n');
    }
    out
}

fn render_bidpacket(result: &AnalysisResult) -> String {
    let summary = &result.summary;
    let mut out = String::from("# Bid Packet\n\n");
    out.push_str(&format!(
        "Coverage: {:.1}% ({} covered / {} partial / {} missing of {})\n\n",
        summary.coverage_percent,
        summary.covered,
        summary.partial,
        summary.missing,
        summary.requirements_total
    ));
    out.push_str("| ID | Category | Status | Response |\n|---|---|---|---|\n");
    for row in &result.rows {
        out.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            row.id,
            row.category,
            row.status,
            row.response_summary.replace('|', "\\|")
        ));
    }
    out
}

fn render_clarifications_email(result: &AnalysisResult) -> String {
    let questions: Vec<&String> = result
        .rows
        .iter()
        .flat_map(|r| r.gaps_or_questions.iter())
        .collect();

    let mut out = String::from(
        "Subject: Clarification questions on requirements coverage\n\nHello,\n\n",
    );
    if questions.is_empty() {
        out.push_str("We reviewed the requirements and have no open questions at this time.\n");
    } else {
        out.push_str("While preparing our response we identified the following open points:\n\n");
        for (idx, question) in questions.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", idx + 1, question));
        }
    }
    out.push_str("\nBest regards\n");
    out
}

fn render_risks_csv(result: &AnalysisResult) -> String {
    let mut out = String::from("requirement_id,category,status,risk\n");
    for row in &result.rows {
        for flag in &row.risk_flags {
            out.push_str(&format!(
                "{},{},{},{}\n",
                csv_field(&row.id),
                csv_field(&row.category),
                row.status,
                csv_field(flag)
            ));
        }
    }
    for risk in &result.summary.risks {
        out.push_str(&format!(",,,{}\n", csv_field(risk)));
    }
    out
}

fn render_proposal_draft(result: &AnalysisResult) -> String {
    let mut out = String::from("# Proposal Draft\n\n## Coverage Overview\n\n");
    out.push_str(&format!(
        "{} of {} requirements are fully covered ({:.1}%).\n\n",
        result.summary.covered, result.summary.requirements_total, result.summary.coverage_percent
    ));
    out.push_str("## Responses\n\n");
    for row in &result.rows {
        out.push_str(&format!("### {}\n\n{}\n\n", row.id, row.response_summary));
    }
    if !result.summary.next_actions.is_empty() {
        out.push_str("## Next Actions\n\n");
        for action in &result.summary.next_actions {
            out.push_str(&format!("- {action}\n"));
        }
    }
    out
}

/// Quote a CSV field when it contains a delimiter, quote, or newline.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
