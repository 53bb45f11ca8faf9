//! Graph persistence: write a built retail graph to Neo4j step by step.

use std::future::Future;
use std::time::Instant;

use serde::Serialize;
use serde_json::json;

use relgraph_core::config::EtlSettings;
use relgraph_graph::{GraphClient, GraphError};
use relgraph_ledger::RunSession;

use crate::error::Result;
use crate::ledger;
use crate::model::RetailGraph;

/// What the graph store reported writing.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct PersistCounts {
    pub constraints: usize,
    pub customers: usize,
    pub products: usize,
    /// Category nodes present after linking products.
    pub categories: i64,
    pub orders: usize,
    pub similarities: usize,
    pub co_purchases: usize,
    pub customer_metrics: usize,
}

/// Persist `model` to Neo4j, recording every step in `session`.
///
/// Order matters: customers and products must exist before orders can be
/// linked to them, and derived relations reference both.
pub async fn persist_model(
    graph: &GraphClient,
    model: &RetailGraph,
    settings: &EtlSettings,
    session: &mut RunSession,
) -> Result<PersistCounts> {
    let batch = settings.batch_size;
    let mut counts = PersistCounts::default();

    if settings.clear_before_load {
        step(session, "clear_database", graph.clear_database(), |_| json!({})).await?;
    }

    counts.constraints = step(session, "create_constraints", graph.create_constraints(), |n| {
        json!({ "constraints": n })
    })
    .await?;

    counts.customers = step(
        session,
        "load_customers",
        graph.load_customers(&model.customers, batch),
        |n| json!({ "rows": n }),
    )
    .await?;

    (counts.products, counts.categories) = step(
        session,
        "load_products",
        graph.load_products(&model.products, batch),
        |(n, c)| json!({ "rows": n, "categories": c }),
    )
    .await?;

    counts.orders = step(
        session,
        "load_orders",
        graph.load_orders(&model.orders, batch),
        |n| json!({ "rows": n }),
    )
    .await?;

    counts.similarities = step(
        session,
        "write_similarities",
        graph.write_similarities(&model.similarities, batch),
        |n| json!({ "relationships": n }),
    )
    .await?;

    counts.co_purchases = step(
        session,
        "write_co_purchases",
        graph.write_co_purchases(&model.co_purchases, batch),
        |n| json!({ "relationships": n }),
    )
    .await?;

    let metrics: Vec<_> = model
        .metrics
        .iter()
        .map(|(id, m)| (*id, m.clone()))
        .collect();
    counts.customer_metrics = step(
        session,
        "write_customer_metrics",
        graph.write_customer_metrics(&metrics, batch),
        |n| json!({ "customers": n }),
    )
    .await?;

    Ok(counts)
}

/// Await one graph operation and record its outcome.
async fn step<T, Fut, F>(session: &mut RunSession, name: &str, op: Fut, counts: F) -> Result<T>
where
    Fut: Future<Output = std::result::Result<T, GraphError>>,
    F: FnOnce(&T) -> serde_json::Value,
{
    let started = Instant::now();
    let outcome = op.await;
    let duration_ms = started.elapsed().as_millis() as u64;

    match outcome {
        Ok(value) => {
            ledger::record_step_ok(session, name, counts(&value), duration_ms);
            Ok(value)
        }
        Err(e) => {
            tracing::error!(step = name, error = %e, "Load step failed");
            ledger::record_step_error(session, name, &e.to_string(), duration_ms);
            Err(e.into())
        }
    }
}
