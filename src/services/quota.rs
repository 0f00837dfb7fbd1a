//! Quota Tracker
//!
//! Per-model circuit-breaker state. The tracker only records and reports
//! quota exhaustion windows; what to do about a blocked model is the
//! orchestrator's decision. A window resets implicitly once the wall clock
//! passes `blocked_until_unix_ms`.

use std::collections::HashMap;
use std::sync::Mutex;

use bidproof_core::model::{now_unix_ms, QuotaMeta};
use tracing::{info, warn};

/// Backoff ceiling when the provider supplies no retry hint
const BACKOFF_CAP_MS: i64 = 60_000;

/// Breaker state for one model
#[derive(Debug, Clone)]
struct QuotaState {
    blocked_until_unix_ms: i64,
    last_error: String,
}

/// Tracks quota exhaustion per model name
pub struct QuotaTracker {
    base_ms: i64,
    step_ms: i64,
    states: Mutex<HashMap<String, QuotaState>>,
}

impl QuotaTracker {
    /// Create a tracker with the given backoff base and per-attempt step.
    pub fn new(base_ms: u64, step_ms: u64) -> Self {
        Self {
            base_ms: base_ms as i64,
            step_ms: step_ms as i64,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Record a quota-exceeded response for `model`.
    ///
    /// Prefers the provider-suggested delay when present; otherwise computes
    /// `base + attempt² × step`, capped at 60 seconds.
    pub fn record_quota_exceeded(
        &self,
        model: &str,
        attempt: u32,
        retry_after_secs: Option<u64>,
        error: &str,
    ) {
        let delay_ms = match retry_after_secs {
            Some(secs) => (secs as i64) * 1000,
            None => {
                let attempt = attempt as i64;
                (self.base_ms + attempt * attempt * self.step_ms).min(BACKOFF_CAP_MS)
            }
        };
        let blocked_until = now_unix_ms() + delay_ms;

        warn!(model, delay_ms, "quota exceeded, blocking model");
        self.states
            .lock()
            .expect("quota state lock poisoned")
            .insert(
                model.to_string(),
                QuotaState {
                    blocked_until_unix_ms: blocked_until,
                    last_error: error.chars().take(300).collect(),
                },
            );
    }

    /// Whether `model` is currently inside a quota exhaustion window
    pub fn is_blocked(&self, model: &str) -> bool {
        self.snapshot(model).blocked
    }

    /// Snapshot the breaker state for `model`.
    ///
    /// `retry_after_seconds` is `max(0, ceil((blocked_until - now)/1000))`.
    pub fn snapshot(&self, model: &str) -> QuotaMeta {
        let state = self
            .states
            .lock()
            .expect("quota state lock poisoned")
            .get(model)
            .cloned();

        let Some(state) = state else {
            return QuotaMeta::default();
        };

        let now = now_unix_ms();
        if now >= state.blocked_until_unix_ms {
            // Window elapsed; the block has implicitly reset.
            info!(model, "quota window elapsed");
            return QuotaMeta {
                blocked: false,
                blocked_until_unix_ms: Some(state.blocked_until_unix_ms),
                retry_after_seconds: Some(0),
                last_error: Some(state.last_error),
            };
        }

        let remaining_ms = state.blocked_until_unix_ms - now;
        QuotaMeta {
            blocked: true,
            blocked_until_unix_ms: Some(state.blocked_until_unix_ms),
            retry_after_seconds: Some((remaining_ms as u64).div_ceil(1000)),
            last_error: Some(state.last_error),
        }
    }
}
