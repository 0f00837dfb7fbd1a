//! Business logic services

pub mod api;
pub mod cache_key;
pub mod exports;
pub mod live_gate;
pub mod orchestrator;
pub mod prompt;
pub mod proof;
pub mod quota;
pub mod result_cache;
pub mod run_store;
