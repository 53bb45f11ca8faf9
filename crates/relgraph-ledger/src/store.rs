//! Run record storage: trait and file-system implementation.
//!
//! ```text
//! {root}/
//!   2024/
//!     01/
//!       15/
//!         {run_id}.json
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::{RunId, RunKind, RunRecord};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Run record not found: {0}")]
    NotFound(RunId),

    #[error("Integrity check failed for run {0}: stored hash does not match content")]
    IntegrityViolation(RunId),

    #[error("Run record has no content hash (not finalized)")]
    NotFinalized,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Filters for listing run records.
#[derive(Debug, Default)]
pub struct RunQuery {
    pub kind: Option<RunKind>,
    /// Only include runs started at or after this time.
    pub from: Option<DateTime<Utc>>,
    /// Only include runs started at or before this time.
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl RunQuery {
    fn matches(&self, record: &RunRecord) -> bool {
        if self.kind.is_some_and(|k| k != record.kind) {
            return false;
        }
        if self.from.is_some_and(|from| record.started_at < from) {
            return false;
        }
        if self.to.is_some_and(|to| record.started_at > to) {
            return false;
        }
        true
    }
}

pub trait RunStore {
    /// Store a finalized record. Unfinalized records are rejected.
    fn save(&self, record: &RunRecord) -> Result<PathBuf, StoreError>;

    /// Retrieve a record by ID, verifying integrity.
    fn get(&self, id: RunId) -> Result<RunRecord, StoreError>;

    /// Records matching the query, newest first.
    fn list(&self, query: &RunQuery) -> Result<Vec<RunRecord>, StoreError>;
}

/// Stores records as pretty JSON files partitioned by start date.
pub struct FsRunStore {
    root: PathBuf,
}

impl FsRunStore {
    /// Creates the root directory if it doesn't exist.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn record_path(&self, record: &RunRecord) -> PathBuf {
        let date = record.started_at.format("%Y/%m/%d");
        self.root.join(format!("{}/{}.json", date, record.id))
    }

    fn find_path(&self, id: RunId) -> Result<PathBuf, StoreError> {
        let filename = format!("{id}.json");
        json_files(&self.root)?
            .into_iter()
            .find(|p| p.file_name().and_then(|n| n.to_str()) == Some(filename.as_str()))
            .ok_or(StoreError::NotFound(id))
    }
}

impl RunStore for FsRunStore {
    fn save(&self, record: &RunRecord) -> Result<PathBuf, StoreError> {
        if record.content_hash.is_none() {
            return Err(StoreError::NotFinalized);
        }

        let path = self.record_path(record);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, serde_json::to_string_pretty(record)?)?;

        tracing::debug!(run_id = %record.id, path = %path.display(), "Run record saved");
        Ok(path)
    }

    fn get(&self, id: RunId) -> Result<RunRecord, StoreError> {
        let path = self.find_path(id)?;
        let record: RunRecord = serde_json::from_str(&fs::read_to_string(&path)?)?;

        if !record.verify_integrity() {
            return Err(StoreError::IntegrityViolation(id));
        }
        Ok(record)
    }

    fn list(&self, query: &RunQuery) -> Result<Vec<RunRecord>, StoreError> {
        let mut results = Vec::new();
        for path in json_files(&self.root)? {
            let record: RunRecord = serde_json::from_str(&fs::read_to_string(&path)?)?;
            if query.matches(&record) {
                results.push(record);
            }
        }

        results.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        if let Some(limit) = query.limit {
            results.truncate(limit);
        }
        Ok(results)
    }
}

/// Finalize a session's record and save it under `dir`.
///
/// Storage failures are logged, not propagated: a run that completed should
/// still report its result even when the ledger is unwritable.
pub fn finalize_and_store(session: crate::RunSession, dir: &str) -> RunRecord {
    let record = session.finalize();

    match FsRunStore::new(dir).and_then(|store| store.save(&record)) {
        Ok(path) => {
            tracing::info!(run_id = %record.id, path = %path.display(), "Run recorded");
        }
        Err(e) => {
            tracing::warn!(run_id = %record.id, error = %e, "Failed to store run record");
        }
    }
    record
}

/// All `.json` files below `dir`, depth-first.
fn json_files(dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    let mut out = Vec::new();
    if !dir.is_dir() {
        return Ok(out);
    }

    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in fs::read_dir(&current)?.flatten() {
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().and_then(|e| e.to_str()) == Some("json") {
                out.push(path);
            }
        }
    }
    Ok(out)
}
