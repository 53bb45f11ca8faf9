//! BLAKE3 content hashing for run records.

use serde::Serialize;

use crate::RunRecord;

/// Everything in a `RunRecord` except `content_hash`.
#[derive(Serialize)]
struct HashableRun<'a> {
    id: &'a crate::RunId,
    kind: &'a crate::RunKind,
    description: &'a str,
    params: &'a serde_json::Value,
    steps: &'a [crate::StepRecord],
    started_at: &'a chrono::DateTime<chrono::Utc>,
    completed_at: &'a Option<chrono::DateTime<chrono::Utc>>,
}

/// Serialize the record (minus its hash) to JSON and hash the bytes.
/// Returns the hex-encoded digest.
pub fn compute_run_hash(record: &RunRecord) -> String {
    let hashable = HashableRun {
        id: &record.id,
        kind: &record.kind,
        description: &record.description,
        params: &record.params,
        steps: &record.steps,
        started_at: &record.started_at,
        completed_at: &record.completed_at,
    };

    // Plain structs and serde_json::Value always serialize.
    let json = serde_json::to_vec(&hashable).unwrap_or_default();
    blake3::hash(&json).to_hex().to_string()
}
