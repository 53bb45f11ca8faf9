//! Run ledger helpers for ETL loads.

use serde_json::json;

use relgraph_core::config::EtlSettings;
use relgraph_ledger::{RunKind, RunSession};

use crate::model::GraphStats;

/// Open a ledger session for a load of `source`.
pub fn start_load_session(source: &str, settings: &EtlSettings) -> RunSession {
    let mut session = RunSession::new(RunKind::Etl, &format!("Load retail dataset {source}"));
    session.set_params(json!({
        "source": source,
        "batch_size": settings.batch_size,
        "clear_before_load": settings.clear_before_load,
        "min_common_products": settings.min_common_products,
        "min_co_purchases": settings.min_co_purchases,
        "vip_threshold": settings.vip_threshold,
        "premium_threshold": settings.premium_threshold,
    }));
    session
}

/// Record validation and derivation of the in-memory graph.
pub fn record_build(session: &mut RunSession, stats: &GraphStats, duration_ms: u64) {
    session.record_step(
        "build_model",
        &format!(
            "Built graph of {} customers, {} products, {} orders ({} rows rejected)",
            stats.customers, stats.products, stats.orders, stats.rejected
        ),
        serde_json::to_value(stats).unwrap_or_default(),
        true,
        duration_ms,
    );
}

pub fn record_step_ok(
    session: &mut RunSession,
    name: &str,
    counts: serde_json::Value,
    duration_ms: u64,
) {
    session.record_step(name, &format!("{name} completed"), counts, true, duration_ms);
}

pub fn record_step_error(session: &mut RunSession, name: &str, error: &str, duration_ms: u64) {
    session.record_step(
        name,
        &format!("{name} failed: {error}"),
        json!({ "error": error }),
        false,
        duration_ms,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_carries_settings_and_steps() {
        let mut session = start_load_session("data/retail.json", &EtlSettings::default());
        record_build(
            &mut session,
            &GraphStats {
                customers: 3,
                rejected: 1,
                ..GraphStats::default()
            },
            5,
        );
        record_step_ok(&mut session, "load_customers", json!({"rows": 3}), 7);
        record_step_error(&mut session, "load_orders", "connection reset", 2);

        let record = session.finalize();
        assert_eq!(record.kind, RunKind::Etl);
        assert_eq!(record.params["source"], "data/retail.json");
        assert_eq!(record.params["batch_size"], 500);
        assert_eq!(record.steps.len(), 3);
        assert_eq!(record.steps[0].counts["customers"], 3);
        assert!(record.steps[0].detail.contains("1 rows rejected"));
        assert_eq!(record.steps[2].detail, "load_orders failed: connection reset");
        assert!(!record.succeeded());
        assert!(record.verify_integrity());
    }
}
