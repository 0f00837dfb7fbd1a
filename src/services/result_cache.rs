//! Result Cache
//!
//! Two-tier cache for analysis results: an in-process map backed by one JSON
//! file per key on disk. Expiry is computed at read time against the stored
//! timestamp; there is no background eviction. Memory is authoritative for
//! the lifetime of the process; disk exists only to survive restarts.
//!
//! Disk writes go to a temp file followed by an atomic rename, so a reader
//! never observes a half-written entry. A disk failure is logged and
//! swallowed: the cache must never fail the caller's request.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use bidproof_core::model::{now_unix_ms, AnalysisResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Disk envelope for one cache entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheEnvelope {
    saved_at_unix_ms: i64,
    data: AnalysisResult,
}

/// Entry age in whole seconds, clamped so a clock skewed behind
/// `savedAtUnixMs` can't wrap when cast.
fn age_seconds(envelope: &CacheEnvelope, now: i64) -> u64 {
    ((now - envelope.saved_at_unix_ms).max(0) / 1000) as u64
}

/// A successful cache read
#[derive(Debug, Clone)]
pub struct CacheHit {
    pub data: AnalysisResult,
    pub age_seconds: u64,
    /// "memory" or "disk"
    pub source: &'static str,
}

/// Two-tier result cache
pub struct ResultCache {
    dir: PathBuf,
    ttl_ms: i64,
    memory: Mutex<HashMap<String, CacheEnvelope>>,
}

impl ResultCache {
    /// Create a cache rooted at `dir` with the given TTL.
    pub fn new(dir: PathBuf, ttl_ms: i64) -> Self {
        Self {
            dir,
            ttl_ms,
            memory: Mutex::new(HashMap::new()),
        }
    }

    /// Look up a key, consulting memory first and disk on a miss.
    ///
    /// Expired, corrupt, or schema-invalid entries are misses, never errors.
    pub fn get(&self, key: &str) -> Option<CacheHit> {
        let now = now_unix_ms();

        if let Some(envelope) = self.read_memory(key) {
            if self.is_fresh(&envelope, now) {
                return Some(CacheHit {
                    age_seconds: age_seconds(&envelope, now),
                    data: envelope.data,
                    source: "memory",
                });
            }
            debug!(key, "memory cache entry expired");
            return None;
        }

        let envelope = self.read_disk(key)?;
        if !self.is_fresh(&envelope, now) {
            debug!(key, "disk cache entry expired");
            return None;
        }

        let hit = CacheHit {
            age_seconds: age_seconds(&envelope, now),
            data: envelope.data.clone(),
            source: "disk",
        };
        self.memory
            .lock()
            .expect("cache map lock poisoned")
            .insert(key.to_string(), envelope);
        Some(hit)
    }

    /// Store a result under `key`.
    ///
    /// Memory is written synchronously; the disk write is best-effort.
    pub fn put(&self, key: &str, data: &AnalysisResult) {
        let envelope = CacheEnvelope {
            saved_at_unix_ms: now_unix_ms(),
            data: data.clone(),
        };

        self.memory
            .lock()
            .expect("cache map lock poisoned")
            .insert(key.to_string(), envelope.clone());

        if let Err(e) = self.write_disk(key, &envelope) {
            warn!(key, error = %e, "disk cache write failed, continuing with memory only");
        }
    }

    fn is_fresh(&self, envelope: &CacheEnvelope, now: i64) -> bool {
        now - envelope.saved_at_unix_ms < self.ttl_ms
    }

    fn read_memory(&self, key: &str) -> Option<CacheEnvelope> {
        self.memory
            .lock()
            .expect("cache map lock poisoned")
            .get(key)
            .cloned()
    }

    fn read_disk(&self, key: &str) -> Option<CacheEnvelope> {
        let path = self.entry_path(key);
        let content = fs::read_to_string(&path).ok()?;
        let envelope: CacheEnvelope = match serde_json::from_str(&content) {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!(key, error = %e, "corrupt disk cache entry treated as miss");
                return None;
            }
        };
        if let Err(e) = envelope.data.validate() {
            debug!(key, error = %e, "invalid disk cache payload treated as miss");
            return None;
        }
        Some(envelope)
    }

    fn write_disk(&self, key: &str, envelope: &CacheEnvelope) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.entry_path(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string(envelope)?)?;
        fs::rename(&tmp, &path)
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Directory backing the disk tier
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
