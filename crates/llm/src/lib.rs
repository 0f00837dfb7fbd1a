//! Bidproof LLM
//!
//! Generative-provider seam for the Bidproof workspace: the provider trait,
//! the provider error taxonomy (the single place that understands provider
//! error payloads, including structured retry-delay hints), and the
//! reqwest-backed REST implementation.
//!
//! ## Module Organization
//!
//! - `error` - Provider error taxonomy (`ProviderError`, `ProviderResult`)
//! - `provider` - `GenerativeProvider` trait
//! - `gemini` - Gemini-style REST provider
//! - `http_client` - HTTP client factory

pub mod error;
pub mod gemini;
pub mod http_client;
pub mod provider;

pub use error::{ProviderError, ProviderResult};
pub use gemini::GeminiProvider;
pub use http_client::build_http_client;
pub use provider::GenerativeProvider;
