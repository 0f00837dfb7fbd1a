//! Execution Orchestrator
//!
//! The mode-driven decision ladder: live → cache → offline. Composes the
//! cache, quota tracker, live gate, provider, and proof verifier into one
//! decision point, and produces the final result plus a full account of how
//! it was obtained. All transient and cache-layer failures are absorbed
//! here; callers only ever see the final ladder outcome.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bidproof_core::model::{
    AnalysisRequest, AnalysisResult, AttemptRecord, CacheMeta, ExecutionMode, LadderLane,
    OrchestratorMeta,
};
use bidproof_core::analyze_offline;
use bidproof_llm::{GenerativeProvider, ProviderError, ProviderResult};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::services::cache_key::derive_cache_key;
use crate::services::live_gate::LiveGate;
use crate::services::prompt::build_analysis_prompt;
use crate::services::proof::verify_proof;
use crate::services::quota::QuotaTracker;
use crate::services::result_cache::ResultCache;

/// Retry-After fallback when the breaker holds no window for the model
const DEFAULT_RETRY_AFTER_SECS: u64 = 30;

/// Maximum random jitter added to each transient-retry backoff
const BACKOFF_JITTER_MS: u64 = 250;

/// Final outcome of one analyze call
#[derive(Debug, Clone)]
pub struct AnalyzeOutcome {
    /// 200 for any completed result including offline fallback; 429 when
    /// live mode is blocked and fallback is disallowed.
    pub http_status: u16,
    /// Retry-After value in seconds, present on 429 responses
    pub retry_after_seconds: Option<u64>,
    /// Absent on 429: a blocked live request never carries a substitute
    pub data: Option<AnalysisResult>,
    pub meta: OrchestratorMeta,
}

impl AnalyzeOutcome {
    /// Whether a result was produced
    pub fn ok(&self) -> bool {
        self.data.is_some()
    }
}

/// Mutable per-request bookkeeping threaded through the ladder
struct LadderContext {
    attempts: Vec<AttemptRecord>,
    warnings: Vec<String>,
    cache: CacheMeta,
}

/// The resilient execution orchestrator
pub struct Orchestrator {
    provider: Arc<dyn GenerativeProvider>,
    cache: Arc<ResultCache>,
    quota: Arc<QuotaTracker>,
    gate: Arc<LiveGate>,
    config: AppConfig,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn GenerativeProvider>,
        cache: Arc<ResultCache>,
        quota: Arc<QuotaTracker>,
        gate: Arc<LiveGate>,
        config: AppConfig,
    ) -> Self {
        Self {
            provider,
            cache,
            quota,
            gate,
            config,
        }
    }

    /// Execute one analysis request through the decision ladder.
    pub async fn analyze(&self, request: &AnalysisRequest) -> AnalyzeOutcome {
        let start = Instant::now();
        let primary = self.primary_model(request);
        let key = derive_cache_key(
            &request.source_text,
            &request.evidence_text,
            &primary,
            &self.config.logic_version,
        );

        let mut ctx = LadderContext {
            attempts: Vec::new(),
            warnings: Vec::new(),
            cache: CacheMeta {
                key: Some(key.clone()),
                ..CacheMeta::default()
            },
        };

        if request.mode == ExecutionMode::Offline {
            return self.offline_outcome(request, &primary, ctx, start);
        }

        let cache_eligible = !request.bust_cache
            && matches!(request.mode, ExecutionMode::Cache | ExecutionMode::Auto);
        if cache_eligible {
            if let Some(hit) = self.cache.get(&key) {
                info!(key = %key, source = hit.source, "cache hit");
                return self.cache_outcome(request, &primary, hit, ctx, start);
            }
            if request.mode == ExecutionMode::Cache {
                ctx.warnings.push(
                    "cache miss: cache-only request required a live attempt".to_string(),
                );
            }
        }

        self.live_ladder(request, &primary, &key, ctx, start).await
    }

    fn primary_model(&self, request: &AnalysisRequest) -> String {
        let requested = request.model_requested.trim();
        if requested.is_empty() {
            self.config.primary_model.clone()
        } else {
            requested.to_string()
        }
    }

    /// Live behavior: breaker pre-check, bounded retries against the primary
    /// model, then the quota-exceeded branching.
    async fn live_ladder(
        &self,
        request: &AnalysisRequest,
        primary: &str,
        key: &str,
        mut ctx: LadderContext,
        start: Instant,
    ) -> AnalyzeOutcome {
        let prompt = build_analysis_prompt(&request.source_text, &request.evidence_text);

        let breaker = self.quota.snapshot(primary);
        if breaker.blocked {
            ctx.warnings.push(format!(
                "model {primary} is quota-blocked for {}s",
                breaker.retry_after_seconds.unwrap_or(0)
            ));
            return self
                .blocked_branch(request, primary, key, &prompt, ctx, start)
                .await;
        }

        for attempt in 1..=self.config.max_transient_attempts {
            let name = format!("live-{attempt}");
            match self.try_model(primary, &prompt, &name, &mut ctx).await {
                Ok(result) => {
                    return self.live_success(request, primary, primary, key, result, ctx, start);
                }
                Err(e) if e.is_quota() => {
                    let retry_hint = match &e {
                        ProviderError::QuotaExceeded {
                            retry_after_secs, ..
                        } => *retry_after_secs,
                        _ => None,
                    };
                    self.quota
                        .record_quota_exceeded(primary, attempt, retry_hint, &e.to_string());
                    return self
                        .blocked_branch(request, primary, key, &prompt, ctx, start)
                        .await;
                }
                Err(e) if e.is_transient() && attempt < self.config.max_transient_attempts => {
                    let delay = self.backoff_delay(attempt);
                    debug!(model = primary, attempt, delay_ms = delay.as_millis() as u64,
                        "transient failure, backing off before retry");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    // Hard failure of this model (malformed output, auth,
                    // invalid request) or transient exhaustion: no further
                    // attempts against the same model with identical inputs.
                    warn!(model = primary, error = %e, "primary model attempts exhausted");
                    break;
                }
            }
        }

        self.blocked_branch(request, primary, key, &prompt, ctx, start)
            .await
    }

    /// Shared branching after the primary model is unavailable: a single
    /// secondary attempt in live mode, offline degradation otherwise.
    async fn blocked_branch(
        &self,
        request: &AnalysisRequest,
        primary: &str,
        key: &str,
        prompt: &str,
        mut ctx: LadderContext,
        start: Instant,
    ) -> AnalyzeOutcome {
        if request.mode != ExecutionMode::Live {
            ctx.warnings
                .push("live lane unavailable: deterministic offline analyzer used".to_string());
            return self.offline_outcome(request, primary, ctx, start);
        }

        let secondary = self.config.secondary_model.clone();
        if secondary == primary || self.quota.is_blocked(&secondary) {
            ctx.warnings
                .push(format!("secondary model {secondary} unavailable"));
            return self.rejected_outcome(request, primary, ctx, start);
        }

        match self
            .try_model(&secondary, prompt, "live-secondary", &mut ctx)
            .await
        {
            Ok(result) => {
                ctx.warnings.push(format!(
                    "primary model {primary} unavailable: secondary model {secondary} used"
                ));
                self.live_success(request, primary, &secondary, key, result, ctx, start)
            }
            Err(e) => {
                if e.is_quota() {
                    let retry_hint = match &e {
                        ProviderError::QuotaExceeded {
                            retry_after_secs, ..
                        } => *retry_after_secs,
                        _ => None,
                    };
                    self.quota
                        .record_quota_exceeded(&secondary, 1, retry_hint, &e.to_string());
                }
                ctx.warnings
                    .push(format!("secondary model {secondary} failed: {e}"));
                self.rejected_outcome(request, primary, ctx, start)
            }
        }
    }

    /// One gated call against `model`, with attempt recording.
    async fn try_model(
        &self,
        model: &str,
        prompt: &str,
        name: &str,
        ctx: &mut LadderContext,
    ) -> ProviderResult<AnalysisResult> {
        let timeout = Duration::from_millis(self.config.attempt_timeout_ms);
        let provider = Arc::clone(&self.provider);
        let started = Instant::now();

        let outcome = self
            .gate
            .call(timeout, || async move {
                let text = provider.generate(model, prompt).await?;
                parse_generated_result(&text)
            })
            .await;

        let elapsed = started.elapsed().as_millis() as u64;
        match &outcome {
            Ok(_) => ctx
                .attempts
                .push(AttemptRecord::success(name, model, elapsed)),
            Err(e) => {
                let aborted = matches!(e, ProviderError::Timeout { .. });
                ctx.attempts.push(AttemptRecord::failure(
                    name,
                    model,
                    elapsed,
                    e.http_status(),
                    aborted,
                    e.to_string(),
                ));
            }
        }
        outcome
    }

    fn live_success(
        &self,
        request: &AnalysisRequest,
        primary: &str,
        model_used: &str,
        key: &str,
        mut result: AnalysisResult,
        ctx: LadderContext,
        start: Instant,
    ) -> AnalyzeOutcome {
        verify_proof(&mut result, &request.evidence_text);
        self.cache.put(key, &result);
        self.completed(
            request,
            primary,
            LadderLane::Live,
            model_used.to_string(),
            result,
            ctx,
            start,
        )
    }

    fn cache_outcome(
        &self,
        request: &AnalysisRequest,
        primary: &str,
        hit: crate::services::result_cache::CacheHit,
        mut ctx: LadderContext,
        start: Instant,
    ) -> AnalyzeOutcome {
        ctx.cache.hit = true;
        ctx.cache.age_seconds = Some(hit.age_seconds);
        ctx.cache.source = Some(hit.source.to_string());

        let mut result = hit.data;
        // Cached entries were verified before the write-through, but the
        // verifier remains on every return path.
        verify_proof(&mut result, &request.evidence_text);
        self.completed(
            request,
            primary,
            LadderLane::Cache,
            primary.to_string(),
            result,
            ctx,
            start,
        )
    }

    fn offline_outcome(
        &self,
        request: &AnalysisRequest,
        primary: &str,
        mut ctx: LadderContext,
        start: Instant,
    ) -> AnalyzeOutcome {
        let lane_started = Instant::now();
        let mut result = analyze_offline(&request.source_text, &request.evidence_text);
        verify_proof(&mut result, &request.evidence_text);
        ctx.attempts.push(AttemptRecord::success(
            "offline",
            "offline",
            lane_started.elapsed().as_millis() as u64,
        ));
        self.completed(
            request,
            primary,
            LadderLane::Offline,
            "offline".to_string(),
            result,
            ctx,
            start,
        )
    }

    /// A live-mode request that nothing live could serve: 429, never an
    /// offline substitute reported as success.
    fn rejected_outcome(
        &self,
        request: &AnalysisRequest,
        primary: &str,
        mut ctx: LadderContext,
        start: Instant,
    ) -> AnalyzeOutcome {
        let quota = self.quota.snapshot(primary);
        let retry_after = quota
            .retry_after_seconds
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
        ctx.warnings
            .push("live mode blocked: retry later or request auto mode".to_string());

        AnalyzeOutcome {
            http_status: 429,
            retry_after_seconds: Some(retry_after),
            data: None,
            meta: OrchestratorMeta {
                mode_requested: request.mode,
                ladder_used: LadderLane::Live,
                model_used: primary.to_string(),
                elapsed_ms: start.elapsed().as_millis() as u64,
                attempts: ctx.attempts,
                warnings: ctx.warnings,
                cache: ctx.cache,
                quota,
            },
        }
    }

    fn completed(
        &self,
        request: &AnalysisRequest,
        primary: &str,
        ladder_used: LadderLane,
        model_used: String,
        result: AnalysisResult,
        ctx: LadderContext,
        start: Instant,
    ) -> AnalyzeOutcome {
        AnalyzeOutcome {
            http_status: 200,
            retry_after_seconds: None,
            data: Some(result),
            meta: OrchestratorMeta {
                mode_requested: request.mode,
                ladder_used,
                model_used,
                elapsed_ms: start.elapsed().as_millis() as u64,
                attempts: ctx.attempts,
                warnings: ctx.warnings,
                cache: ctx.cache,
                quota: self.quota.snapshot(primary),
            },
        }
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        let attempt = attempt as u64;
        let base = self.config.backoff_base_ms + attempt * attempt * self.config.backoff_step_ms;
        let capped = base.min(self.config.backoff_cap_ms);
        let jitter = rand::thread_rng().gen_range(0..=BACKOFF_JITTER_MS);
        Duration::from_millis(capped + jitter)
    }
}

/// Parse and validate generated model output.
///
/// Tolerates a Markdown code fence around the JSON body; anything else that
/// fails to parse or validate is a malformed-output failure of the attempt.
fn parse_generated_result(text: &str) -> ProviderResult<AnalysisResult> {
    let body = strip_code_fence(text);
    let result: AnalysisResult =
        serde_json::from_str(body).map_err(|e| ProviderError::MalformedOutput {
            message: format!("generated output is not valid result JSON: {e}"),
        })?;
    result
        .validate()
        .map_err(|e| ProviderError::MalformedOutput {
            message: e.to_string(),
        })?;
    Ok(result)
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.trim_start_matches(['\r', '\n'])
        .trim_end_matches('`')
        .trim()
}
