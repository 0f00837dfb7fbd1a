//! Analysis Data Model
//!
//! Core types for analysis requests, results, and orchestrator metadata.
//! Wire-facing structs serialize with camelCase field names to match the
//! response envelope consumed by presentation layers.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{CoreError, CoreResult};

/// Requested execution mode for an analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Call the external service; never substitute an offline result.
    Live,
    /// Prefer the cache; upgrade to live on a miss.
    Cache,
    /// Deterministic local analysis only; never touch cache or network.
    Offline,
    /// Prefer cache, then live, then offline.
    Auto,
}

impl Default for ExecutionMode {
    fn default() -> Self {
        Self::Auto
    }
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionMode::Live => write!(f, "live"),
            ExecutionMode::Cache => write!(f, "cache"),
            ExecutionMode::Offline => write!(f, "offline"),
            ExecutionMode::Auto => write!(f, "auto"),
        }
    }
}

impl FromStr for ExecutionMode {
    type Err = CoreError;

    /// Parse a mode string, rejecting unrecognized values early.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "live" => Ok(ExecutionMode::Live),
            "cache" => Ok(ExecutionMode::Cache),
            "offline" => Ok(ExecutionMode::Offline),
            "auto" | "" => Ok(ExecutionMode::Auto),
            other => Err(CoreError::validation(format!(
                "Unknown execution mode: {other}"
            ))),
        }
    }
}

/// The execution lane that actually served a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LadderLane {
    Live,
    Cache,
    Offline,
}

impl std::fmt::Display for LadderLane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LadderLane::Live => write!(f, "live"),
            LadderLane::Cache => write!(f, "cache"),
            LadderLane::Offline => write!(f, "offline"),
        }
    }
}

/// Coverage status for a single requirement row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoverageStatus {
    Covered,
    Partial,
    Missing,
}

impl std::fmt::Display for CoverageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoverageStatus::Covered => write!(f, "Covered"),
            CoverageStatus::Partial => write!(f, "Partial"),
            CoverageStatus::Missing => write!(f, "Missing"),
        }
    }
}

/// An immutable analysis request, created once per call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    /// Requirements source text (e.g. the RFP body)
    pub source_text: String,
    /// Evidence text the coverage claims must be grounded in
    pub evidence_text: String,
    /// Model the caller asked for
    pub model_requested: String,
    /// Requested execution mode
    #[serde(default)]
    pub mode: ExecutionMode,
    /// Skip the cache read and force a fresh computation
    #[serde(default)]
    pub bust_cache: bool,
}

/// One requirement with its coverage verdict and supporting evidence
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementRow {
    pub id: String,
    pub category: String,
    pub status: CoverageStatus,
    pub response_summary: String,
    #[serde(default)]
    pub evidence_ids: Vec<String>,
    #[serde(default)]
    pub evidence_quotes: Vec<String>,
    #[serde(default)]
    pub gaps_or_questions: Vec<String>,
    #[serde(default)]
    pub risk_flags: Vec<String>,
}

/// Aggregate counts and findings over all requirement rows
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    pub requirements_total: usize,
    pub covered: usize,
    pub partial: usize,
    pub missing: usize,
    /// Percentage of requirements with Covered status
    pub coverage_percent: f64,
    /// Percentage of evidence references the verifier could ground
    pub proof_percent: f64,
    #[serde(default)]
    pub risks: Vec<String>,
    #[serde(default)]
    pub next_actions: Vec<String>,
}

/// A complete analysis result: summary plus ordered requirement rows
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub summary: AnalysisSummary,
    pub rows: Vec<RequirementRow>,
}

impl AnalysisResult {
    /// Structural validation of a result payload.
    ///
    /// Applied to generated model output (a failure is a hard failure of
    /// that attempt) and to disk cache reads (a failure is a cache miss).
    pub fn validate(&self) -> CoreResult<()> {
        if self.rows.is_empty() {
            return Err(CoreError::validation("result has no requirement rows"));
        }
        for (idx, row) in self.rows.iter().enumerate() {
            if row.id.trim().is_empty() {
                return Err(CoreError::validation(format!("row {idx} has an empty id")));
            }
        }
        if self.summary.requirements_total != self.rows.len() {
            return Err(CoreError::validation(format!(
                "summary counts {} requirements but result has {} rows",
                self.summary.requirements_total,
                self.rows.len()
            )));
        }
        let status_total = self.summary.covered + self.summary.partial + self.summary.missing;
        if status_total != self.rows.len() {
            return Err(CoreError::validation(
                "summary status counts do not add up to the row count",
            ));
        }
        Ok(())
    }
}

/// Record of a single external call attempt, never mutated after append
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    /// Attempt label (e.g. "live-1", "live-secondary", "offline")
    pub name: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    pub elapsed_ms: u64,
    pub aborted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_preview: Option<String>,
}

impl AttemptRecord {
    /// Create a successful attempt record
    pub fn success(name: impl Into<String>, model: impl Into<String>, elapsed_ms: u64) -> Self {
        Self {
            name: name.into(),
            ok: true,
            http_status: None,
            elapsed_ms,
            aborted: false,
            model_used: Some(model.into()),
            error_preview: None,
        }
    }

    /// Create a failed attempt record
    pub fn failure(
        name: impl Into<String>,
        model: impl Into<String>,
        elapsed_ms: u64,
        http_status: Option<u16>,
        aborted: bool,
        error: impl Into<String>,
    ) -> Self {
        let error = error.into();
        let preview: String = error.chars().take(200).collect();
        Self {
            name: name.into(),
            ok: false,
            http_status,
            elapsed_ms,
            aborted,
            model_used: Some(model.into()),
            error_preview: Some(preview),
        }
    }
}

/// Cache consultation outcome for one request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheMeta {
    pub hit: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_seconds: Option<u64>,
    /// "memory" or "disk" on a hit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Breaker state snapshot for the requested model
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaMeta {
    pub blocked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_until_unix_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Full account of how a response was produced
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorMeta {
    pub mode_requested: ExecutionMode,
    pub ladder_used: LadderLane,
    /// Model that produced the result, or "offline"
    pub model_used: String,
    pub elapsed_ms: u64,
    pub attempts: Vec<AttemptRecord>,
    pub warnings: Vec<String>,
    pub cache: CacheMeta,
    pub quota: QuotaMeta,
}

/// The five generated export artifacts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSet {
    pub proofpack: String,
    pub bidpacket: String,
    pub clarifications_email: String,
    pub risks_csv: String,
    pub proposal_draft: String,
}

/// The persisted, replayable artifact of one end-to-end run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunBundle {
    pub run_id: String,
    /// RFC 3339 creation timestamp
    pub created_at: String,
    pub orchestrator: OrchestratorMeta,
    pub analysis: AnalysisResult,
    pub exports: ExportSet,
}

impl RunBundle {
    /// Build the lightweight listing summary for this bundle
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            run_id: self.run_id.clone(),
            created_at: self.created_at.clone(),
            mode_requested: self.orchestrator.mode_requested,
            ladder_used: self.orchestrator.ladder_used,
            model_used: self.orchestrator.model_used.clone(),
            coverage_percent: self.analysis.summary.coverage_percent,
            requirements_total: self.analysis.summary.requirements_total,
        }
    }
}

/// Listing view of a stored run (no full payload)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub run_id: String,
    pub created_at: String,
    pub mode_requested: ExecutionMode,
    pub ladder_used: LadderLane,
    pub model_used: String,
    pub coverage_percent: f64,
    pub requirements_total: usize,
}

/// Current time as Unix milliseconds
pub fn now_unix_ms() -> i64 {
    Utc::now().timestamp_millis()
}
