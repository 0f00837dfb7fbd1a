//! Bidproof Core
//!
//! Foundational types for the Bidproof workspace: the analysis data model,
//! the closed execution-mode enum, text normalization shared by cache keying
//! and proof verification, and the deterministic offline analyzer. This crate
//! has zero dependencies on application-level code (HTTP, providers, stores).
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `model` - Request/result/meta data model (`AnalysisRequest`, `AnalysisResult`, ...)
//! - `normalize` - Text normalization helpers
//! - `offline` - Deterministic offline coverage analyzer

pub mod error;
pub mod model;
pub mod normalize;
pub mod offline;

pub use error::{CoreError, CoreResult};
pub use model::{
    AnalysisRequest, AnalysisResult, AnalysisSummary, AttemptRecord, CacheMeta, CoverageStatus,
    ExecutionMode, ExportSet, LadderLane, OrchestratorMeta, QuotaMeta, RequirementRow, RunBundle,
    RunSummary,
};
pub use normalize::{normalize_for_key, normalize_for_proof};
pub use offline::analyze_offline;
