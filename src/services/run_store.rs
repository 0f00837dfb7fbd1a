//! Run Store
//!
//! Append-only store for run bundles so a full analysis + export cycle can
//! be replayed and audited later. Memory-first with a recency-bounded
//! resident set; disk persistence is best-effort, one JSON file per run.
//! Disk unavailability degrades to memory-only operation, never an error.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

use bidproof_core::model::{RunBundle, RunSummary};
use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

/// In-memory resident set with insertion-ordered recency tracking
struct Resident {
    bundles: HashMap<String, RunBundle>,
    order: Vec<String>,
}

/// Append-only run bundle store
pub struct RunStore {
    dir: PathBuf,
    max_resident: usize,
    resident: Mutex<Resident>,
}

impl RunStore {
    /// Create a store rooted at `dir`, keeping the most recent
    /// `max_resident` bundles in memory.
    pub fn new(dir: PathBuf, max_resident: usize) -> Self {
        Self {
            dir,
            max_resident: max_resident.max(1),
            resident: Mutex::new(Resident {
                bundles: HashMap::new(),
                order: Vec::new(),
            }),
        }
    }

    /// Generate a fresh run identifier: timestamp-prefixed so directory
    /// listings sort naturally even without mtimes.
    pub fn new_run_id() -> String {
        format!(
            "run-{}-{}",
            Utc::now().format("%Y%m%dT%H%M%S"),
            Uuid::new_v4().simple()
        )
    }

    /// Persist a bundle: memory synchronously, disk best-effort.
    pub fn save_run(&self, bundle: &RunBundle) {
        self.remember(bundle.clone());
        if let Err(e) = self.write_disk(bundle) {
            warn!(run_id = %bundle.run_id, error = %e,
                "run bundle disk write failed, keeping memory copy only");
        }
    }

    /// Fetch a bundle by id, rehydrating memory from disk when needed.
    pub fn get_run(&self, run_id: &str) -> Option<RunBundle> {
        if let Some(bundle) = self
            .resident
            .lock()
            .expect("run store lock poisoned")
            .bundles
            .get(run_id)
        {
            return Some(bundle.clone());
        }

        let bundle = self.read_disk(run_id)?;
        self.remember(bundle.clone());
        Some(bundle)
    }

    /// List the most recent runs, newest first, summaries only.
    ///
    /// Prefers disk entries ordered by file modification time; falls back to
    /// whatever is resident in memory when the directory is unreadable.
    pub fn list_runs(&self, limit: usize) -> Vec<RunSummary> {
        match self.list_disk(limit) {
            Some(summaries) if !summaries.is_empty() => summaries,
            _ => self.list_memory(limit),
        }
    }

    fn remember(&self, bundle: RunBundle) {
        let mut resident = self.resident.lock().expect("run store lock poisoned");
        let run_id = bundle.run_id.clone();
        resident.order.retain(|id| id != &run_id);
        resident.order.push(run_id.clone());
        resident.bundles.insert(run_id, bundle);

        while resident.order.len() > self.max_resident {
            let evicted = resident.order.remove(0);
            resident.bundles.remove(&evicted);
            debug!(run_id = %evicted, "evicted run bundle from resident set");
        }
    }

    fn write_disk(&self, bundle: &RunBundle) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.bundle_path(&bundle.run_id);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(bundle)?)?;
        fs::rename(&tmp, &path)
    }

    fn read_disk(&self, run_id: &str) -> Option<RunBundle> {
        let content = fs::read_to_string(self.bundle_path(run_id)).ok()?;
        match serde_json::from_str(&content) {
            Ok(bundle) => Some(bundle),
            Err(e) => {
                warn!(run_id, error = %e, "corrupt run bundle on disk");
                None
            }
        }
    }

    fn list_disk(&self, limit: usize) -> Option<Vec<RunSummary>> {
        let entries = fs::read_dir(&self.dir).ok()?;
        let mut files: Vec<(SystemTime, PathBuf)> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|p| {
                let mtime = fs::metadata(&p).and_then(|m| m.modified()).ok()?;
                Some((mtime, p))
            })
            .collect();
        files.sort_by(|a, b| b.0.cmp(&a.0));

        let mut summaries = Vec::new();
        for (_, path) in files {
            if summaries.len() >= limit {
                break;
            }
            let Ok(content) = fs::read_to_string(&path) else {
                continue;
            };
            match serde_json::from_str::<RunBundle>(&content) {
                Ok(bundle) => summaries.push(bundle.summary()),
                Err(e) => debug!(path = %path.display(), error = %e, "skipping unreadable bundle"),
            }
        }
        Some(summaries)
    }

    fn list_memory(&self, limit: usize) -> Vec<RunSummary> {
        let resident = self.resident.lock().expect("run store lock poisoned");
        resident
            .order
            .iter()
            .rev()
            .take(limit)
            .filter_map(|id| resident.bundles.get(id))
            .map(RunBundle::summary)
            .collect()
    }

    fn bundle_path(&self, run_id: &str) -> PathBuf {
        self.dir.join(format!("{run_id}.json"))
    }

    /// Directory backing the disk tier
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
