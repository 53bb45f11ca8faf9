//! Incremental recorder for a pipeline run.
//!
//! ```no_run
//! # use relgraph_ledger::{RunKind, RunSession};
//! let mut session = RunSession::new(RunKind::Etl, "Load retail dataset");
//! session.set_params(serde_json::json!({"dataset": "data/retail.json"}));
//! session.record_step("load_customers", "Loaded 100 customers", serde_json::json!({"rows": 100}), true, 42);
//! let record = session.finalize();
//! assert!(record.content_hash.is_some());
//! ```

use chrono::Utc;

use crate::{RunId, RunKind, RunRecord, StepRecord};

pub struct RunSession {
    record: RunRecord,
}

impl RunSession {
    pub fn new(kind: RunKind, description: &str) -> Self {
        Self {
            record: RunRecord {
                id: RunId::new(),
                kind,
                description: description.to_string(),
                params: serde_json::Value::Null,
                steps: Vec::new(),
                started_at: Utc::now(),
                completed_at: None,
                content_hash: None,
            },
        }
    }

    pub fn set_params(&mut self, params: serde_json::Value) {
        self.record.params = params;
    }

    pub fn record_step(
        &mut self,
        name: &str,
        detail: &str,
        counts: serde_json::Value,
        success: bool,
        duration_ms: u64,
    ) {
        self.record.steps.push(StepRecord {
            name: name.to_string(),
            detail: detail.to_string(),
            counts,
            success,
            duration_ms,
            timestamp: Utc::now(),
        });
    }

    /// The run ID (available before finalization).
    pub fn id(&self) -> RunId {
        self.record.id
    }

    pub fn steps(&self) -> &[StepRecord] {
        &self.record.steps
    }

    /// Set completed_at and compute the content hash.
    pub fn finalize(mut self) -> RunRecord {
        self.record.completed_at = Some(Utc::now());
        let hash = self.record.compute_hash();
        self.record.content_hash = Some(hash);
        self.record
    }
}
