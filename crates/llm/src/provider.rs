//! Generative Provider Trait
//!
//! Defines the common interface for generative providers. The orchestrator
//! only ever talks to this trait, which keeps provider quirks out of the
//! decision ladder and lets tests substitute a scripted mock.

use async_trait::async_trait;

use crate::error::ProviderResult;

/// Trait that all generative providers must implement.
#[async_trait]
pub trait GenerativeProvider: Send + Sync {
    /// Returns the provider name for identification.
    fn name(&self) -> &'static str;

    /// Generate a completion for `prompt` using `model`.
    ///
    /// The model is per-call rather than per-provider because the
    /// orchestrator switches between a primary and a secondary model on the
    /// same provider when quota runs out.
    ///
    /// Returns the raw generated text; the caller owns schema parsing.
    async fn generate(&self, model: &str, prompt: &str) -> ProviderResult<String>;
}
