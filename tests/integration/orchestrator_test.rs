//! Orchestrator Integration Tests
//!
//! The decision ladder against a scripted provider: live success and
//! caching, transient retries, quota blocking with the live-mode 429
//! contract, offline degradation in auto mode, and the run operation's
//! persistence and export generation. Every test runs against an isolated
//! temp data directory.

use std::sync::Arc;

use bidproof::{LiveGate, Orchestrator, QuotaTracker, ResultCache};
use bidproof_core::model::{ExecutionMode, LadderLane};
use bidproof_llm::ProviderError;
use tempfile::tempdir;

use crate::helpers::{
    fixture_request, generated_result_json, test_config, test_service, MockProvider,
    GROUNDED_QUOTE,
};

fn test_orchestrator(provider: Arc<MockProvider>, root: &std::path::Path) -> Orchestrator {
    let config = test_config(root);
    let cache = Arc::new(ResultCache::new(config.cache_dir(), config.cache_ttl_ms()));
    let quota = Arc::new(QuotaTracker::new(
        config.backoff_base_ms,
        config.backoff_step_ms,
    ));
    let gate = Arc::new(LiveGate::new(config.min_gap_ms));
    Orchestrator::new(provider, cache, quota, gate, config)
}

fn quota_err(retry_after_secs: Option<u64>) -> ProviderError {
    ProviderError::QuotaExceeded {
        message: "rate limit".to_string(),
        retry_after_secs,
    }
}

#[tokio::test]
async fn test_live_success_then_cache_hit() {
    let dir = tempdir().unwrap();
    let provider = Arc::new(MockProvider::new());
    provider.push_ok(generated_result_json(GROUNDED_QUOTE));
    let orchestrator = test_orchestrator(Arc::clone(&provider), dir.path());

    let request = fixture_request(ExecutionMode::Auto);
    let first = orchestrator.analyze(&request).await;
    assert_eq!(first.http_status, 200);
    assert!(first.ok());
    assert_eq!(first.meta.ladder_used, LadderLane::Live);
    assert_eq!(first.meta.model_used, "gemini-2.0-flash");
    assert_eq!(first.meta.attempts.len(), 1);
    assert_eq!(first.meta.attempts[0].name, "live-1");
    assert!(first.meta.attempts[0].ok);
    assert!(!first.meta.cache.hit);
    // The grounded quote verifies, so the proof percentage is full.
    let data = first.data.unwrap();
    assert_eq!(data.summary.proof_percent, 100.0);
    assert!(data.rows[0].risk_flags.is_empty());

    // Identical request: served from memory cache, no second provider call.
    let second = orchestrator.analyze(&request).await;
    assert_eq!(provider.call_count(), 1);
    assert_eq!(second.meta.ladder_used, LadderLane::Cache);
    assert!(second.meta.cache.hit);
    assert_eq!(second.meta.cache.source.as_deref(), Some("memory"));
    assert!(second.meta.cache.age_seconds.is_some());
}

#[tokio::test]
async fn test_bust_cache_forces_a_fresh_live_call() {
    let dir = tempdir().unwrap();
    let provider = Arc::new(MockProvider::new());
    provider.push_ok(generated_result_json(GROUNDED_QUOTE));
    provider.push_ok(generated_result_json(GROUNDED_QUOTE));
    let orchestrator = test_orchestrator(Arc::clone(&provider), dir.path());

    let mut request = fixture_request(ExecutionMode::Auto);
    orchestrator.analyze(&request).await;
    assert_eq!(provider.call_count(), 1);

    request.bust_cache = true;
    let busted = orchestrator.analyze(&request).await;
    assert_eq!(provider.call_count(), 2);
    assert_eq!(busted.meta.ladder_used, LadderLane::Live);
    assert!(!busted.meta.cache.hit);
}

#[tokio::test]
async fn test_transient_failure_is_retried_on_the_same_model() {
    let dir = tempdir().unwrap();
    let provider = Arc::new(MockProvider::new());
    provider.push_err(ProviderError::ServerError {
        status: 503,
        message: "upstream overloaded".to_string(),
    });
    provider.push_ok(generated_result_json(GROUNDED_QUOTE));
    let orchestrator = test_orchestrator(Arc::clone(&provider), dir.path());

    let outcome = orchestrator.analyze(&fixture_request(ExecutionMode::Live)).await;
    assert_eq!(outcome.http_status, 200);
    assert_eq!(outcome.meta.ladder_used, LadderLane::Live);
    assert_eq!(outcome.meta.attempts.len(), 2);
    assert_eq!(outcome.meta.attempts[0].name, "live-1");
    assert!(!outcome.meta.attempts[0].ok);
    assert_eq!(outcome.meta.attempts[0].http_status, Some(503));
    assert_eq!(outcome.meta.attempts[1].name, "live-2");
    assert!(outcome.meta.attempts[1].ok);
}

#[tokio::test]
async fn test_transient_exhaustion_in_auto_mode_degrades_to_offline() {
    let dir = tempdir().unwrap();
    let provider = Arc::new(MockProvider::new());
    for _ in 0..3 {
        provider.push_err(ProviderError::NetworkError {
            message: "connection reset".to_string(),
        });
    }
    let orchestrator = test_orchestrator(Arc::clone(&provider), dir.path());

    let outcome = orchestrator.analyze(&fixture_request(ExecutionMode::Auto)).await;
    assert_eq!(outcome.http_status, 200);
    assert!(outcome.ok());
    assert_eq!(outcome.meta.ladder_used, LadderLane::Offline);
    assert_eq!(outcome.meta.model_used, "offline");
    assert_eq!(provider.call_count(), 3);
    // Three failed live attempts plus the synthetic offline record.
    assert_eq!(outcome.meta.attempts.len(), 4);
    assert_eq!(outcome.meta.attempts[3].name, "offline");
    assert!(outcome.meta.attempts[3].ok);
    assert!(outcome
        .meta
        .warnings
        .iter()
        .any(|w| w.contains("offline analyzer")));
}

#[tokio::test]
async fn test_live_mode_quota_on_both_models_yields_429() {
    let dir = tempdir().unwrap();
    let provider = Arc::new(MockProvider::new());
    provider.push_err(quota_err(Some(7)));
    provider.push_err(quota_err(Some(9)));
    let orchestrator = test_orchestrator(Arc::clone(&provider), dir.path());

    let outcome = orchestrator.analyze(&fixture_request(ExecutionMode::Live)).await;
    assert_eq!(outcome.http_status, 429);
    assert!(outcome.data.is_none());
    let retry_after = outcome.retry_after_seconds.expect("429 carries Retry-After");
    assert!((1..=7).contains(&retry_after));
    assert_eq!(outcome.meta.ladder_used, LadderLane::Live);
    assert_eq!(outcome.meta.attempts.len(), 2);
    assert_eq!(outcome.meta.attempts[0].http_status, Some(429));
    assert_eq!(outcome.meta.attempts[1].name, "live-secondary");
    assert!(outcome.meta.quota.blocked);
}

#[tokio::test]
async fn test_auto_mode_quota_degrades_to_offline_with_200() {
    let dir = tempdir().unwrap();
    let provider = Arc::new(MockProvider::new());
    provider.push_err(quota_err(Some(30)));
    let orchestrator = test_orchestrator(Arc::clone(&provider), dir.path());

    let outcome = orchestrator.analyze(&fixture_request(ExecutionMode::Auto)).await;
    assert_eq!(outcome.http_status, 200);
    assert!(outcome.ok());
    assert_eq!(outcome.meta.ladder_used, LadderLane::Offline);
    assert_eq!(outcome.meta.model_used, "offline");
    assert!(outcome.meta.quota.blocked);
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn test_tripped_breaker_rejects_live_without_new_calls() {
    let dir = tempdir().unwrap();
    let provider = Arc::new(MockProvider::new());
    provider.push_err(quota_err(Some(60)));
    provider.push_err(quota_err(Some(60)));
    let orchestrator = test_orchestrator(Arc::clone(&provider), dir.path());

    let request = fixture_request(ExecutionMode::Live);
    let first = orchestrator.analyze(&request).await;
    assert_eq!(first.http_status, 429);
    assert_eq!(provider.call_count(), 2);

    // Both breakers are now tripped: the second request is rejected before
    // the provider is consulted.
    let second = orchestrator.analyze(&request).await;
    assert_eq!(second.http_status, 429);
    assert_eq!(provider.call_count(), 2);
    assert!(second.meta.attempts.is_empty());
    assert!(second.retry_after_seconds.is_some());
}

#[tokio::test]
async fn test_malformed_output_falls_through_to_the_secondary_model() {
    let dir = tempdir().unwrap();
    let provider = Arc::new(MockProvider::new());
    provider.push_ok("I am unable to analyze this document.");
    provider.push_ok(generated_result_json(GROUNDED_QUOTE));
    let orchestrator = test_orchestrator(Arc::clone(&provider), dir.path());

    let outcome = orchestrator.analyze(&fixture_request(ExecutionMode::Live)).await;
    assert_eq!(outcome.http_status, 200);
    assert_eq!(outcome.meta.model_used, "gemini-2.0-flash-lite");
    assert_eq!(outcome.meta.attempts.len(), 2);
    assert!(!outcome.meta.attempts[0].ok);
    assert_eq!(outcome.meta.attempts[1].name, "live-secondary");
    assert!(outcome.meta.attempts[1].ok);
}

#[tokio::test]
async fn test_cache_mode_miss_upgrades_to_live_with_a_warning() {
    let dir = tempdir().unwrap();
    let provider = Arc::new(MockProvider::new());
    provider.push_ok(generated_result_json(GROUNDED_QUOTE));
    let orchestrator = test_orchestrator(Arc::clone(&provider), dir.path());

    let outcome = orchestrator.analyze(&fixture_request(ExecutionMode::Cache)).await;
    assert_eq!(outcome.http_status, 200);
    assert_eq!(outcome.meta.ladder_used, LadderLane::Live);
    assert!(outcome
        .meta
        .warnings
        .iter()
        .any(|w| w.contains("cache miss")));
}

#[tokio::test]
async fn test_offline_mode_makes_no_external_calls() {
    let dir = tempdir().unwrap();
    let provider = Arc::new(MockProvider::new());
    let orchestrator = test_orchestrator(Arc::clone(&provider), dir.path());

    let outcome = orchestrator
        .analyze(&fixture_request(ExecutionMode::Offline))
        .await;
    assert_eq!(outcome.http_status, 200);
    assert!(outcome.ok());
    assert_eq!(outcome.meta.ladder_used, LadderLane::Offline);
    assert_eq!(outcome.meta.model_used, "offline");
    assert_eq!(provider.call_count(), 0);
    assert!(!outcome.meta.cache.hit);

    let data = outcome.data.unwrap();
    assert!(!data.rows.is_empty());
    assert_eq!(data.summary.requirements_total, data.rows.len());
}

#[tokio::test]
async fn test_run_persists_bundle_and_generates_all_exports() {
    let dir = tempdir().unwrap();
    let provider = Arc::new(MockProvider::new());
    let service = test_service(Arc::clone(&provider), dir.path());

    let outcome = service.run(&fixture_request(ExecutionMode::Offline)).await;
    assert_eq!(outcome.http_status, 200);
    let response = outcome.response.expect("200 carries a response");
    assert!(response.ok);
    assert!(response.orchestrator.run_id.starts_with("run-"));
    assert_eq!(response.orchestrator.ladder_used, LadderLane::Offline);

    assert!(!response.exports.proofpack.is_empty());
    assert!(!response.exports.bidpacket.is_empty());
    assert!(!response.exports.clarifications_email.is_empty());
    assert!(!response.exports.risks_csv.is_empty());
    assert!(!response.exports.proposal_draft.is_empty());

    let bundle = service
        .get_run(&response.orchestrator.run_id)
        .expect("persisted run is retrievable");
    assert_eq!(bundle.run_id, response.orchestrator.run_id);
    assert_eq!(bundle.analysis.rows.len(), response.run_summary.requirements_total);

    let listed = service.list_runs(10);
    assert!(listed.iter().any(|s| s.run_id == bundle.run_id));
}

#[tokio::test]
async fn test_rejected_run_persists_nothing() {
    let dir = tempdir().unwrap();
    let provider = Arc::new(MockProvider::new());
    provider.push_err(quota_err(None));
    provider.push_err(quota_err(None));
    let service = test_service(Arc::clone(&provider), dir.path());

    let outcome = service.run(&fixture_request(ExecutionMode::Live)).await;
    assert_eq!(outcome.http_status, 429);
    assert!(outcome.response.is_none());
    assert!(outcome.retry_after_seconds.is_some());
    assert!(!outcome.warnings.is_empty());
    assert!(service.list_runs(10).is_empty());
}

#[tokio::test]
async fn test_offline_degradation_is_reported_as_a_fallback() {
    let dir = tempdir().unwrap();
    let provider = Arc::new(MockProvider::new());
    provider.push_err(quota_err(Some(15)));
    let service = test_service(Arc::clone(&provider), dir.path());

    let response = service.analyze(&fixture_request(ExecutionMode::Auto)).await;
    assert!(response.ok);
    assert_eq!(response.http_status, 200);
    assert!(response.meta.fallback_used);
    assert_eq!(response.meta.model_used, "offline");
    assert_eq!(response.meta.model_requested, "gemini-2.0-flash");
}

#[tokio::test]
async fn test_plain_live_success_is_not_a_fallback() {
    let dir = tempdir().unwrap();
    let provider = Arc::new(MockProvider::new());
    provider.push_ok(generated_result_json(GROUNDED_QUOTE));
    let service = test_service(Arc::clone(&provider), dir.path());

    let response = service.analyze(&fixture_request(ExecutionMode::Live)).await;
    assert!(response.ok);
    assert!(!response.meta.fallback_used);
    assert_eq!(response.meta.model_used, "gemini-2.0-flash");
}
