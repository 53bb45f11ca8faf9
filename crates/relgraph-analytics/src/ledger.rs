//! Run ledger helpers for analytics operations.

use relgraph_etl::GraphStats;
use relgraph_ledger::store::finalize_and_store;
use relgraph_ledger::{RunId, RunKind, RunSession};

/// Open a ledger session for one analytics operation.
pub fn start_analytics_session(
    operation: &str,
    source: &str,
    params: serde_json::Value,
) -> RunSession {
    let mut session = RunSession::new(RunKind::Analytics, &format!("Analytics: {operation}"));
    session.set_params(serde_json::json!({
        "operation": operation,
        "source": source,
        "params": params,
    }));
    session
}

pub fn record_model(session: &mut RunSession, stats: &GraphStats, duration_ms: u64) {
    session.record_step(
        "load_model",
        &format!(
            "Loaded {} customers, {} orders, {} similarity relations",
            stats.customers, stats.orders, stats.similarities
        ),
        serde_json::to_value(stats).unwrap_or_default(),
        true,
        duration_ms,
    );
}

pub fn record_result(
    session: &mut RunSession,
    step: &str,
    detail: &str,
    counts: serde_json::Value,
    duration_ms: u64,
) {
    session.record_step(step, detail, counts, true, duration_ms);
}

pub fn record_error(session: &mut RunSession, step: &str, error: &str) {
    session.record_step(
        step,
        &format!("{step} failed: {error}"),
        serde_json::json!({ "error": error }),
        false,
        0,
    );
}

/// Store the session when a ledger directory is configured.
pub fn finish(session: RunSession, ledger_dir: Option<&str>) -> Option<RunId> {
    ledger_dir.map(|dir| finalize_and_store(session, dir).id)
}
