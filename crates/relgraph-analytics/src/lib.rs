//! relgraph-analytics: Graph analytics for the retail graph.
//!
//! Builds the retail graph from Neo4j (or an offline dataset), then runs
//! centrality and community detection over customer similarity, fraud
//! pattern detection over orders, and product recommendations. Scores and
//! fraud flags can be written back to Neo4j. Every operation is recorded
//! in the run ledger.

pub mod algorithms;
pub mod error;
pub mod fetch;
pub mod fraud;
pub mod graph;
pub mod ledger;
pub mod recommend;
pub mod types;

pub use error::AnalyticsError;
pub use fetch::DataSource;
pub use types::{QueryRequest, QueryResponse};

use std::time::Instant;

use serde_json::json;

use relgraph_core::config::AnalyticsSettings;
use relgraph_core::CustomerId;
use relgraph_etl::derive::DeriveSettings;
use relgraph_etl::RetailGraph;
use relgraph_graph::{CoPurchaseRecord, CustomerScore};
use relgraph_ledger::RunSession;

use crate::algorithms::PageRankParams;
use crate::fraud::FraudThresholds;
use crate::graph::SimilarityGraph;
use crate::types::{
    CentralityReport, CommunityInfo, CustomerCentrality, FraudReport, GraphStats,
    InfluenceReport, PathReport, RecommendationReport, SameDayReport,
};

const DEFAULT_BATCH_SIZE: usize = 500;

/// The analytics engine.
pub struct AnalyticsEngine {
    source: DataSource,
    settings: AnalyticsSettings,
    derive: DeriveSettings,
    batch_size: usize,
    ledger_dir: Option<String>,
}

impl AnalyticsEngine {
    pub fn new(source: DataSource, settings: AnalyticsSettings) -> Self {
        Self {
            source,
            settings,
            derive: DeriveSettings::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            ledger_dir: None,
        }
    }

    /// Thresholds for deriving relations when building the graph.
    pub fn with_derive_settings(mut self, derive: DeriveSettings) -> Self {
        self.derive = derive;
        self
    }

    /// Rows per write-back transaction.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Enable run ledger recording.
    pub fn with_ledger_dir(mut self, dir: String) -> Self {
        self.ledger_dir = Some(dir);
        self
    }

    /// PageRank, betweenness and Louvain communities over customer
    /// similarity. With `write_back`, scores are stored on `Customer` nodes.
    pub async fn run_centrality(&self, write_back: bool) -> error::Result<CentralityReport> {
        let params = json!({ "write": write_back });
        self.require_writable("centrality", &params, write_back)?;
        let start = Instant::now();
        let (mut session, model) = self.open("centrality", params).await?;

        if model.customers.is_empty() {
            return Err(self.abort(session, "centrality", AnalyticsError::EmptyGraph));
        }

        let step_start = Instant::now();
        let graph = SimilarityGraph::from_model(&model);
        let ranks = algorithms::pagerank(&graph, &PageRankParams::from(&self.settings));
        let betweenness = algorithms::betweenness(&graph);
        let communities = algorithms::louvain(
            &graph,
            self.settings.louvain_resolution,
            self.settings.weighted_communities,
        );

        let mut customers: Vec<CustomerCentrality> = graph
            .nodes
            .iter()
            .map(|n| CustomerCentrality {
                customer_id: n.customer_id,
                name: n.name.clone(),
                pagerank: ranks[n.index],
                betweenness: betweenness[n.index],
                community: communities.assignment[n.index],
            })
            .collect();
        customers.sort_by(|a, b| {
            b.pagerank
                .total_cmp(&a.pagerank)
                .then(a.customer_id.cmp(&b.customer_id))
        });

        let community_info: Vec<CommunityInfo> = communities
            .communities
            .iter()
            .map(|c| CommunityInfo {
                id: c.id,
                size: c.members.len(),
                members: c.members.iter().map(|&i| graph.customer_id(i)).collect(),
            })
            .collect();

        let graph_stats = GraphStats {
            customers: graph.node_count(),
            similarity_edges: graph.edge_count(),
        };

        ledger::record_result(
            &mut session,
            "centrality",
            &format!(
                "Ranked {} customers into {} communities (modularity {:.3})",
                graph_stats.customers,
                community_info.len(),
                communities.modularity
            ),
            json!({
                "customers": graph_stats.customers,
                "similarity_edges": graph_stats.similarity_edges,
                "communities": community_info.len(),
                "modularity": communities.modularity,
            }),
            step_start.elapsed().as_millis() as u64,
        );

        let written = match self.source.client().filter(|_| write_back) {
            Some(client) => {
                let scores: Vec<CustomerScore> = customers
                    .iter()
                    .map(|c| CustomerScore {
                        customer_id: c.customer_id,
                        pagerank: c.pagerank,
                        betweenness: c.betweenness,
                        community: c.community,
                    })
                    .collect();
                let step_start = Instant::now();
                match client.write_customer_scores(&scores, self.batch_size).await {
                    Ok(n) => {
                        ledger::record_result(
                            &mut session,
                            "write_customer_scores",
                            &format!("Wrote scores for {n} customers"),
                            json!({ "customers": n }),
                            step_start.elapsed().as_millis() as u64,
                        );
                        Some(n)
                    }
                    Err(e) => return Err(self.abort(session, "write_customer_scores", e.into())),
                }
            }
            None => None,
        };

        let computation_ms = start.elapsed().as_millis() as u64;
        let run_id = self.finish(session);

        tracing::info!(
            customers = graph_stats.customers,
            communities = community_info.len(),
            modularity = communities.modularity,
            computation_ms,
            "Centrality computed"
        );

        Ok(CentralityReport {
            graph_stats,
            customers,
            communities: community_info,
            modularity: communities.modularity,
            written,
            computation_ms,
            run_id,
        })
    }

    /// Run every fraud pattern. With `write_back`, previous flags are cleared
    /// and the alerted orders are flagged.
    pub async fn detect_fraud(&self, write_back: bool) -> error::Result<FraudReport> {
        let params = json!({ "write": write_back });
        self.require_writable("fraud", &params, write_back)?;
        let start = Instant::now();
        let (mut session, model) = self.open("fraud", params).await?;

        let step_start = Instant::now();
        let alerts = fraud::detect(&model, &FraudThresholds::from(&self.settings));
        let summary = fraud::summarize(&alerts);
        ledger::record_result(
            &mut session,
            "detect_fraud",
            &format!(
                "{} alerts across {} customers",
                summary.total_alerts, summary.customers_flagged
            ),
            serde_json::to_value(&summary).unwrap_or_default(),
            step_start.elapsed().as_millis() as u64,
        );

        let flagged_orders = match self.source.client().filter(|_| write_back) {
            Some(client) => {
                let flags = fraud::order_flags(&alerts);
                let step_start = Instant::now();
                let outcome = match client.clear_fraud_flags().await {
                    Ok(()) => client.flag_orders(&flags, self.batch_size).await,
                    Err(e) => Err(e),
                };
                match outcome {
                    Ok(n) => {
                        ledger::record_result(
                            &mut session,
                            "flag_orders",
                            &format!("Flagged {n} orders"),
                            json!({ "orders": n }),
                            step_start.elapsed().as_millis() as u64,
                        );
                        Some(n)
                    }
                    Err(e) => return Err(self.abort(session, "flag_orders", e.into())),
                }
            }
            None => None,
        };

        let computation_ms = start.elapsed().as_millis() as u64;
        let run_id = self.finish(session);

        tracing::info!(
            alerts = summary.total_alerts,
            customers = summary.customers_flagged,
            computation_ms,
            "Fraud detection complete"
        );

        Ok(FraudReport {
            alerts,
            summary,
            flagged_orders,
            computation_ms,
            run_id,
        })
    }

    pub async fn recommend(
        &self,
        customer: CustomerId,
        limit: Option<usize>,
    ) -> error::Result<RecommendationReport> {
        let limit = limit.unwrap_or(self.settings.recommendation_limit);
        let (mut session, model) = self
            .open(
                "recommend",
                json!({ "customer_id": customer, "limit": limit }),
            )
            .await?;

        let recommendations = match recommend::recommend_products(&model, customer, limit) {
            Ok(r) => r,
            Err(e) => return Err(self.abort(session, "recommend", e)),
        };
        ledger::record_result(
            &mut session,
            "recommend",
            &format!("{} products recommended for customer {customer}", recommendations.len()),
            json!({ "recommendations": recommendations.len() }),
            0,
        );

        Ok(RecommendationReport {
            customer_id: customer,
            recommendations,
            run_id: self.finish(session),
        })
    }

    /// Strongest-similarity path between two customers.
    pub async fn shortest_path(
        &self,
        from: CustomerId,
        to: CustomerId,
    ) -> error::Result<PathReport> {
        let (mut session, model) = self
            .open("path", json!({ "from": from, "to": to }))
            .await?;

        let graph = SimilarityGraph::from_model(&model);
        let (src, tgt) = match (graph.node_index.get(&from), graph.node_index.get(&to)) {
            (Some(&s), Some(&t)) => (s, t),
            (None, _) => return Err(self.abort(session, "path", AnalyticsError::CustomerNotFound(from))),
            (_, None) => return Err(self.abort(session, "path", AnalyticsError::CustomerNotFound(to))),
        };

        let found = algorithms::shortest_path(&graph, src, tgt);
        ledger::record_result(
            &mut session,
            "path",
            &match &found {
                Some(p) => format!("Path of {} hops from {from} to {to}", p.node_indices.len() - 1),
                None => format!("No path from {from} to {to}"),
            },
            json!({ "found": found.is_some() }),
            0,
        );

        Ok(PathReport {
            from,
            to,
            cost: found.as_ref().map(|p| p.total_cost),
            path: found.map(|p| {
                p.node_indices
                    .into_iter()
                    .map(|i| graph.customer_id(i))
                    .collect()
            }),
            run_id: self.finish(session),
        })
    }

    /// Products ranked by co-purchase pull, plus the strongest pairs. The
    /// pairs are read from Neo4j when that is the source.
    pub async fn influence(&self, limit: Option<usize>) -> error::Result<InfluenceReport> {
        let limit = limit.unwrap_or(self.settings.recommendation_limit);
        let (mut session, model) = self.open("influence", json!({ "limit": limit })).await?;

        let products = recommend::co_purchase_influence(&model, limit);
        let top_pairs = match self.source.client() {
            Some(client) => match client.top_co_purchased(limit as u32).await {
                Ok(pairs) => pairs,
                Err(e) => return Err(self.abort(session, "top_co_purchased", e.into())),
            },
            None => top_pairs_from_model(&model, limit),
        };
        ledger::record_result(
            &mut session,
            "influence",
            &format!("{} products, {} pairs", products.len(), top_pairs.len()),
            json!({ "products": products.len(), "pairs": top_pairs.len() }),
            0,
        );

        Ok(InfluenceReport {
            products,
            top_pairs,
            run_id: self.finish(session),
        })
    }

    /// Customer-days whose orders total at least `threshold` (default: the
    /// configured same-day threshold). Runs server-side on Neo4j.
    pub async fn same_day(&self, threshold: Option<f64>) -> error::Result<SameDayReport> {
        let threshold = threshold.unwrap_or(self.settings.same_day_threshold);
        let min_orders = self.settings.same_day_min_orders;
        let params = json!({ "threshold": threshold, "min_orders": min_orders });

        let (mut session, days) = match &self.source {
            DataSource::Neo4j(client) => {
                let session = ledger::start_analytics_session("same_day", self.source.describe(), params);
                match client.same_day_high_value(threshold, min_orders as i64).await {
                    Ok(days) => (session, days),
                    Err(e) => return Err(self.abort(session, "same_day_high_value", e.into())),
                }
            }
            DataSource::Dataset(_) => {
                let (session, model) = self.open("same_day", params).await?;
                (session, fraud::same_day_totals(&model, threshold, min_orders))
            }
        };
        ledger::record_result(
            &mut session,
            "same_day",
            &format!("{} customer-days at or above {threshold:.2}", days.len()),
            json!({ "days": days.len() }),
            0,
        );

        Ok(SameDayReport {
            threshold,
            days,
            run_id: self.finish(session),
        })
    }

    /// Dispatch a tagged request.
    pub async fn query(&self, request: QueryRequest) -> error::Result<QueryResponse> {
        Ok(match request {
            QueryRequest::Centrality { write } => QueryResponse::Centrality(self.run_centrality(write).await?),
            QueryRequest::Fraud { write } => QueryResponse::Fraud(self.detect_fraud(write).await?),
            QueryRequest::Recommend { customer_id, limit } => {
                QueryResponse::Recommend(self.recommend(customer_id, limit).await?)
            }
            QueryRequest::Path { from, to } => QueryResponse::Path(self.shortest_path(from, to).await?),
            QueryRequest::Influence { limit } => QueryResponse::Influence(self.influence(limit).await?),
            QueryRequest::SameDay { threshold } => QueryResponse::SameDay(self.same_day(threshold).await?),
        })
    }

    // ── Internals ────────────────────────────────────────────────

    /// Refuse write-back against an offline source. The refusal is still
    /// stored as a failed run.
    fn require_writable(
        &self,
        operation: &str,
        params: &serde_json::Value,
        write_back: bool,
    ) -> error::Result<()> {
        if write_back && self.source.client().is_none() {
            let session =
                ledger::start_analytics_session(operation, self.source.describe(), params.clone());
            return Err(self.abort(session, "write_back", AnalyticsError::WriteBackUnavailable));
        }
        Ok(())
    }

    /// Start a ledger session and build the retail graph from the source.
    async fn open(
        &self,
        operation: &str,
        params: serde_json::Value,
    ) -> error::Result<(RunSession, RetailGraph)> {
        let mut session =
            ledger::start_analytics_session(operation, self.source.describe(), params);
        let start = Instant::now();
        match fetch::fetch_model(&self.source, &self.derive).await {
            Ok(model) => {
                ledger::record_model(&mut session, &model.stats(), start.elapsed().as_millis() as u64);
                Ok((session, model))
            }
            Err(e) => Err(self.abort(session, "load_model", e)),
        }
    }

    /// Record a failed step, store the run, and hand the error back.
    fn abort(&self, mut session: RunSession, step: &str, err: AnalyticsError) -> AnalyticsError {
        tracing::warn!(step, error = %err, "Analytics operation failed");
        ledger::record_error(&mut session, step, &err.to_string());
        ledger::finish(session, self.ledger_dir.as_deref());
        err
    }

    fn finish(&self, session: RunSession) -> Option<String> {
        ledger::finish(session, self.ledger_dir.as_deref()).map(|id| id.to_string())
    }
}

/// Strongest co-purchase pairs, highest frequency first.
fn top_pairs_from_model(model: &RetailGraph, limit: usize) -> Vec<CoPurchaseRecord> {
    let mut pairs: Vec<_> = model.co_purchases.iter().collect();
    pairs.sort_by(|a, b| {
        b.frequency
            .cmp(&a.frequency)
            .then(a.source.cmp(&b.source))
            .then(a.target.cmp(&b.target))
    });

    let name = |id| model.product(id).map(|p| p.name.clone()).unwrap_or_default();
    pairs
        .into_iter()
        .take(limit)
        .map(|cp| CoPurchaseRecord {
            source: cp.source,
            source_name: name(cp.source),
            target: cp.target,
            target_name: name(cp.target),
            frequency: cp.frequency as i64,
        })
        .collect()
}
