//! Service API
//!
//! The externally consumed operations: analyze, run (analyze + exports +
//! persistence), and run retrieval. Presentation layers talk to this module
//! only; they never reach into the orchestrator's internals.

use std::sync::Arc;

use bidproof_core::model::{
    AnalysisRequest, AnalysisResult, AnalysisSummary, AttemptRecord, CacheMeta, ExecutionMode,
    LadderLane, OrchestratorMeta, QuotaMeta, RunBundle, RunSummary,
};
use bidproof_llm::GenerativeProvider;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::AppConfig;
use crate::services::exports::generate_exports;
use crate::services::live_gate::LiveGate;
use crate::services::orchestrator::{AnalyzeOutcome, Orchestrator};
use crate::services::quota::QuotaTracker;
use crate::services::result_cache::ResultCache;
use crate::services::run_store::RunStore;
use crate::utils::error::{AppError, AppResult};

/// Response metadata for the analyze operation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMeta {
    pub model_requested: String,
    pub model_used: String,
    pub fallback_used: bool,
    pub warnings: Vec<String>,
    pub cache: CacheMeta,
    pub quota: QuotaMeta,
}

/// Analyze operation envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<AnalysisResult>,
    pub meta: ResponseMeta,
    /// Transport status: 200 for any completed result, 429 when live mode
    /// is blocked and fallback is disallowed.
    #[serde(skip)]
    pub http_status: u16,
    /// Retry-After value in seconds, present alongside a 429
    #[serde(skip)]
    pub retry_after_seconds: Option<u64>,
}

/// Orchestrator section of the run operation envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOrchestratorMeta {
    pub run_id: String,
    pub mode_requested: ExecutionMode,
    pub ladder_used: LadderLane,
    pub model_used: String,
    pub elapsed_ms: u64,
    pub attempts: Vec<AttemptRecord>,
    pub warnings: Vec<String>,
    pub cache: CacheMeta,
}

/// Run operation envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResponse {
    pub ok: bool,
    pub orchestrator: RunOrchestratorMeta,
    pub run_summary: AnalysisSummary,
    pub exports: bidproof_core::model::ExportSet,
}

/// Outcome of the run operation, carrying transport status
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub http_status: u16,
    pub retry_after_seconds: Option<u64>,
    /// Present on 200; absent when the live lane rejected the request
    pub response: Option<RunResponse>,
    /// Warnings from a rejected run, for caller diagnostics
    pub warnings: Vec<String>,
}

/// The composed service stack behind every external operation
pub struct AnalysisService {
    orchestrator: Orchestrator,
    runs: Arc<RunStore>,
    primary_model: String,
}

impl AnalysisService {
    /// Build the full service stack from configuration. All shared state
    /// (cache map, breaker, gate chain) lives in the services constructed
    /// here and is passed by reference; nothing is module-scoped.
    pub fn new(provider: Arc<dyn GenerativeProvider>, config: AppConfig) -> Self {
        let cache = Arc::new(ResultCache::new(config.cache_dir(), config.cache_ttl_ms()));
        let quota = Arc::new(QuotaTracker::new(
            config.backoff_base_ms,
            config.backoff_step_ms,
        ));
        let gate = Arc::new(LiveGate::new(config.min_gap_ms));
        let runs = Arc::new(RunStore::new(config.runs_dir(), config.max_resident_runs));
        let primary_model = config.primary_model.clone();
        let orchestrator = Orchestrator::new(provider, cache, quota, gate, config);

        Self {
            orchestrator,
            runs,
            primary_model,
        }
    }

    /// Analyze operation: produce a verified result via the decision ladder.
    pub async fn analyze(&self, request: &AnalysisRequest) -> AnalyzeResponse {
        let outcome = self.orchestrator.analyze(request).await;
        self.envelope(request, outcome)
    }

    /// Run operation: analyze, generate the export set, persist the bundle.
    pub async fn run(&self, request: &AnalysisRequest) -> RunOutcome {
        let outcome = self.orchestrator.analyze(request).await;

        let Some(result) = outcome.data else {
            return RunOutcome {
                http_status: outcome.http_status,
                retry_after_seconds: outcome.retry_after_seconds,
                response: None,
                warnings: outcome.meta.warnings,
            };
        };

        let run_id = RunStore::new_run_id();
        let exports = generate_exports(&result, &outcome.meta);
        let bundle = RunBundle {
            run_id: run_id.clone(),
            created_at: Utc::now().to_rfc3339(),
            orchestrator: outcome.meta.clone(),
            analysis: result.clone(),
            exports: exports.clone(),
        };
        self.runs.save_run(&bundle);
        info!(run_id = %run_id, lane = %outcome.meta.ladder_used, "run persisted");

        let meta = outcome.meta;
        RunOutcome {
            http_status: 200,
            retry_after_seconds: None,
            response: Some(RunResponse {
                ok: true,
                orchestrator: RunOrchestratorMeta {
                    run_id,
                    mode_requested: meta.mode_requested,
                    ladder_used: meta.ladder_used,
                    model_used: meta.model_used,
                    elapsed_ms: meta.elapsed_ms,
                    attempts: meta.attempts,
                    warnings: meta.warnings,
                    cache: meta.cache,
                },
                run_summary: result.summary,
                exports,
            }),
            warnings: Vec::new(),
        }
    }

    /// Fetch a stored run bundle by id.
    pub fn get_run(&self, run_id: &str) -> AppResult<RunBundle> {
        self.runs
            .get_run(run_id)
            .ok_or_else(|| AppError::not_found(format!("run {run_id}")))
    }

    /// List recent run summaries, newest first.
    pub fn list_runs(&self, limit: usize) -> Vec<RunSummary> {
        self.runs.list_runs(limit)
    }

    fn envelope(&self, request: &AnalysisRequest, outcome: AnalyzeOutcome) -> AnalyzeResponse {
        let model_requested = if request.model_requested.trim().is_empty() {
            self.primary_model.clone()
        } else {
            request.model_requested.trim().to_string()
        };
        let fallback_used = compute_fallback_used(&outcome.meta);

        AnalyzeResponse {
            ok: outcome.data.is_some(),
            data: outcome.data,
            meta: ResponseMeta {
                model_requested,
                model_used: outcome.meta.model_used,
                fallback_used,
                warnings: outcome.meta.warnings,
                cache: outcome.meta.cache,
                quota: outcome.meta.quota,
            },
            http_status: outcome.http_status,
            retry_after_seconds: outcome.retry_after_seconds,
        }
    }
}

/// A response counts as a fallback when it was served by a lane or model the
/// caller did not ask for: offline degradation of a non-offline request, or
/// the secondary model standing in for the primary.
fn compute_fallback_used(meta: &OrchestratorMeta) -> bool {
    if meta.mode_requested != ExecutionMode::Offline && meta.ladder_used == LadderLane::Offline {
        return true;
    }
    meta.attempts
        .iter()
        .any(|a| a.name == "live-secondary" && a.ok)
}
