//! HTTP Client Factory
//!
//! Provides a factory function for building reqwest clients with a shared
//! request timeout and user agent.

use std::time::Duration;

/// Build a `reqwest::Client` with the given request timeout.
///
/// The client-level timeout is a backstop; the orchestrator's gate applies
/// the caller-supplied per-attempt timeout on top of it.
pub fn build_http_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent("Bidproof/0.1")
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}
