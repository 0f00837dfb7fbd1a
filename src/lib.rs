//! Bidproof - Resilient Analysis Orchestrator
//!
//! Produces a verified requirements-coverage analysis for a (source,
//! evidence) text pair using the best available execution lane - live
//! generative model, cache, or deterministic offline computation - and never
//! misreports how a result was produced.
//!
//! - Orchestration services live in `services`
//! - Configuration in `config`
//! - Shared error types in `utils::error`
//! - The data model and offline analyzer come from `bidproof-core`
//! - The provider seam comes from `bidproof-llm`

pub mod config;
pub mod services;
pub mod utils;

pub use config::AppConfig;
pub use services::api::{AnalysisService, AnalyzeResponse, RunOutcome, RunResponse};
pub use services::cache_key::derive_cache_key;
pub use services::live_gate::LiveGate;
pub use services::orchestrator::{AnalyzeOutcome, Orchestrator};
pub use services::proof::{verify_proof, ProofReport, EVIDENCE_MISMATCH_FLAG};
pub use services::quota::QuotaTracker;
pub use services::result_cache::ResultCache;
pub use services::run_store::RunStore;
pub use utils::error::{AppError, AppResult};
