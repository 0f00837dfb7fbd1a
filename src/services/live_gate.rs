//! Live Gate
//!
//! Serializes every external call process-wide and enforces a minimum gap
//! between calls, measured from the previous call's completion. Each call is
//! wrapped with a caller-supplied timeout. The gate never retries; retry
//! policy belongs to the orchestrator.

use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use bidproof_llm::{ProviderError, ProviderResult};
use tokio::sync::Semaphore;
use tracing::debug;

/// One-at-a-time gate with minimum spacing between calls
pub struct LiveGate {
    permit: Semaphore,
    min_gap: Duration,
    last_completion: Mutex<Option<Instant>>,
}

impl LiveGate {
    /// Create a gate with the given minimum gap between call completions
    /// and subsequent call starts.
    pub fn new(min_gap_ms: u64) -> Self {
        Self {
            permit: Semaphore::new(1),
            min_gap: Duration::from_millis(min_gap_ms),
            last_completion: Mutex::new(None),
        }
    }

    /// Run `call` under the gate with the given timeout.
    ///
    /// Waits for the previous call's completion plus the minimum gap before
    /// starting. On timeout the call yields `ProviderError::Timeout`, which
    /// callers record as an aborted attempt. The permit is released on every
    /// path, success or failure.
    pub async fn call<F, Fut, T>(&self, timeout: Duration, call: F) -> ProviderResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ProviderResult<T>>,
    {
        let _permit = self
            .permit
            .acquire()
            .await
            .map_err(|_| ProviderError::Other {
                message: "live gate closed".to_string(),
            })?;

        if let Some(wait) = self.gap_remaining() {
            debug!(wait_ms = wait.as_millis() as u64, "honoring minimum call gap");
            tokio::time::sleep(wait).await;
        }

        let outcome = match tokio::time::timeout(timeout, call()).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            }),
        };

        *self
            .last_completion
            .lock()
            .expect("gate timestamp lock poisoned") = Some(Instant::now());

        outcome
    }

    fn gap_remaining(&self) -> Option<Duration> {
        let last = (*self
            .last_completion
            .lock()
            .expect("gate timestamp lock poisoned"))?;
        self.min_gap.checked_sub(last.elapsed()).filter(|d| !d.is_zero())
    }
}
