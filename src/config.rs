//! Application Configuration
//!
//! Orchestrator tuning knobs with serde defaults, plus a small service for
//! loading and saving the JSON config file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::utils::error::{AppError, AppResult};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Primary model for live analysis
    pub primary_model: String,
    /// Secondary model tried once when the primary's quota is exhausted
    pub secondary_model: String,
    /// Analysis logic version; bump to invalidate all prior cache entries
    pub logic_version: String,
    /// Cache entry time-to-live in days, checked at read time
    pub cache_ttl_days: u64,
    /// Minimum gap between live calls, measured from the previous call's completion
    pub min_gap_ms: u64,
    /// Per-attempt timeout for live calls
    pub attempt_timeout_ms: u64,
    /// Bounded retry count for transient failures
    pub max_transient_attempts: u32,
    /// Backoff base delay
    pub backoff_base_ms: u64,
    /// Backoff per-attempt step (scaled by attempt squared)
    pub backoff_step_ms: u64,
    /// Backoff ceiling
    pub backoff_cap_ms: u64,
    /// Most recent runs kept resident in memory
    pub max_resident_runs: usize,
    /// Data directory override; defaults to the platform data dir
    pub data_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            primary_model: "gemini-2.0-flash".to_string(),
            secondary_model: "gemini-2.0-flash-lite".to_string(),
            logic_version: "coverage-v3".to_string(),
            cache_ttl_days: 7,
            min_gap_ms: 1200,
            attempt_timeout_ms: 90_000,
            max_transient_attempts: 3,
            backoff_base_ms: 2_000,
            backoff_step_ms: 1_500,
            backoff_cap_ms: 60_000,
            max_resident_runs: 20,
            data_dir: None,
        }
    }
}

impl AppConfig {
    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.primary_model.trim().is_empty() {
            return Err("primary_model must not be empty".to_string());
        }
        if self.secondary_model.trim().is_empty() {
            return Err("secondary_model must not be empty".to_string());
        }
        if self.logic_version.trim().is_empty() {
            return Err("logic_version must not be empty".to_string());
        }
        if self.max_transient_attempts == 0 {
            return Err("max_transient_attempts must be at least 1".to_string());
        }
        if self.max_resident_runs == 0 {
            return Err("max_resident_runs must be at least 1".to_string());
        }
        Ok(())
    }

    /// Resolved data directory root
    pub fn data_root(&self) -> PathBuf {
        match &self.data_dir {
            Some(dir) => dir.clone(),
            None => dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("bidproof"),
        }
    }

    /// Directory for disk cache entries
    pub fn cache_dir(&self) -> PathBuf {
        self.data_root().join("cache")
    }

    /// Directory for persisted run bundles
    pub fn runs_dir(&self) -> PathBuf {
        self.data_root().join("runs")
    }

    /// Cache TTL in milliseconds
    pub fn cache_ttl_ms(&self) -> i64 {
        (self.cache_ttl_days * 24 * 60 * 60 * 1000) as i64
    }

    /// Load configuration from a file, falling back to defaults when the
    /// file does not exist.
    pub fn load_or_default(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        config.validate().map_err(AppError::config)?;
        Ok(config)
    }

    /// Save configuration to a file with pretty formatting
    pub fn save(&self, path: &Path) -> AppResult<()> {
        self.validate().map_err(AppError::config)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
