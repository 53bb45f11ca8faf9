//! ETL orchestration: dataset → validated retail graph → Neo4j.

use std::collections::BTreeMap;
use std::time::Instant;

use serde::Serialize;

use relgraph_core::config::EtlSettings;
use relgraph_core::Dataset;
use relgraph_graph::GraphClient;
use relgraph_ledger::store::finalize_and_store;

use crate::derive::DeriveSettings;
use crate::error::{EtlError, Result};
use crate::ledger;
use crate::model::{GraphStats, RetailGraph};
use crate::persist::{self, PersistCounts};
use crate::validate::RejectedRow;

/// Outcome of a load (or of a dry-run plan).
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub source: String,
    /// False for a plan, which never touches Neo4j.
    pub persisted: bool,
    pub stats: GraphStats,
    /// Customers per spend tier.
    pub tiers: BTreeMap<String, usize>,
    pub rejected: Vec<RejectedRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub written: Option<PersistCounts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    pub duration_ms: u64,
}

impl LoadReport {
    fn from_model(model: &RetailGraph, source: &str, started: Instant) -> Self {
        let mut tiers = BTreeMap::new();
        for m in model.metrics.values() {
            *tiers.entry(m.customer_tier.as_str().to_string()).or_insert(0) += 1;
        }
        Self {
            source: source.to_string(),
            persisted: false,
            stats: model.stats(),
            tiers,
            rejected: model.rejected.clone(),
            written: None,
            run_id: None,
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }
}

/// Validate and derive without writing anything.
pub fn plan(dataset: Dataset, settings: &EtlSettings, source: &str) -> LoadReport {
    let started = Instant::now();
    let model = RetailGraph::build(dataset, &DeriveSettings::from(settings));
    LoadReport::from_model(&model, source, started)
}

/// Loads datasets into Neo4j and records each load in the run ledger.
#[derive(Clone)]
pub struct EtlPipeline {
    graph: GraphClient,
    settings: EtlSettings,
    ledger_dir: String,
}

impl EtlPipeline {
    pub fn new(graph: GraphClient, settings: EtlSettings, ledger_dir: impl Into<String>) -> Self {
        Self {
            graph,
            settings,
            ledger_dir: ledger_dir.into(),
        }
    }

    /// Run a full load. The ledger record is saved whether or not the load
    /// succeeds; a failing step is recorded before its error is returned.
    pub async fn run(&self, dataset: Dataset, source: &str) -> Result<LoadReport> {
        let started = Instant::now();
        let mut session = ledger::start_load_session(source, &self.settings);

        let build_started = Instant::now();
        let model = RetailGraph::build(dataset, &DeriveSettings::from(&self.settings));
        let stats = model.stats();
        ledger::record_build(
            &mut session,
            &stats,
            build_started.elapsed().as_millis() as u64,
        );

        // Refuse to clear the graph for a load that would write nothing.
        if stats.customers == 0 && stats.products == 0 {
            ledger::record_step_error(&mut session, "build_model", "no valid rows", 0);
            finalize_and_store(session, &self.ledger_dir);
            return Err(EtlError::EmptyDataset);
        }

        let outcome = persist::persist_model(&self.graph, &model, &self.settings, &mut session).await;
        let record = finalize_and_store(session, &self.ledger_dir);
        let written = outcome?;

        let mut report = LoadReport::from_model(&model, source, started);
        report.persisted = true;
        report.written = Some(written);
        report.run_id = Some(record.id.to_string());

        tracing::info!(
            run_id = %record.id,
            source = %source,
            customers = stats.customers,
            products = stats.products,
            orders = stats.orders,
            similarities = stats.similarities,
            co_purchases = stats.co_purchases,
            rejected = stats.rejected,
            duration_ms = report.duration_ms,
            "Load complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{generate_sample, SampleSpec};

    #[test]
    fn test_plan_reports_without_persisting() {
        let ds = generate_sample(&SampleSpec::default(), 42);
        let report = plan(ds, &EtlSettings::default(), "sample");

        assert!(!report.persisted);
        assert!(report.written.is_none());
        assert!(report.run_id.is_none());
        assert_eq!(report.stats.customers, 100);
        assert_eq!(report.stats.orders, 200);
        assert_eq!(
            report.tiers.values().sum::<usize>(),
            report.stats.customers_with_metrics
        );
    }

    #[test]
    fn test_plan_reports_rejected_rows() {
        let mut ds = generate_sample(
            &SampleSpec {
                customers: 4,
                products: 2,
                orders: 6,
            },
            9,
        );
        ds.orders[0].quantity = 0;
        let report = plan(ds, &EtlSettings::default(), "sample");

        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.stats.orders, 5);
        assert_eq!(report.stats.rejected, 1);
    }

    #[test]
    fn test_report_json_omits_unset_fields() {
        let report = plan(Dataset::default(), &EtlSettings::default(), "empty");
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["source"], "empty");
        assert_eq!(json["persisted"], false);
        assert!(json.get("written").is_none());
        assert!(json.get("run_id").is_none());
        assert_eq!(json["stats"]["customers"], 0);
    }
}
