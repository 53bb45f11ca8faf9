//! Request and response types for analytics operations.

use serde::{Deserialize, Serialize};

use relgraph_core::CustomerId;
use relgraph_graph::{CoPurchaseRecord, SameDayRecord};

use crate::fraud::{FraudAlert, FraudSummary};
use crate::recommend::{InfluenceEntry, Recommendation};

/// A request read from stdin by `relgraph-analytics query`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum QueryRequest {
    Centrality {
        #[serde(default)]
        write: bool,
    },
    Fraud {
        #[serde(default)]
        write: bool,
    },
    Recommend {
        customer_id: CustomerId,
        limit: Option<usize>,
    },
    Path {
        from: CustomerId,
        to: CustomerId,
    },
    Influence {
        limit: Option<usize>,
    },
    SameDay {
        threshold: Option<f64>,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "op", content = "result", rename_all = "snake_case")]
pub enum QueryResponse {
    Centrality(CentralityReport),
    Fraud(FraudReport),
    Recommend(RecommendationReport),
    Path(PathReport),
    Influence(InfluenceReport),
    SameDay(SameDayReport),
}

/// Size of the similarity graph an operation ran on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphStats {
    pub customers: usize,
    pub similarity_edges: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerCentrality {
    pub customer_id: CustomerId,
    pub name: String,
    pub pagerank: f64,
    pub betweenness: f64,
    pub community: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunityInfo {
    pub id: u32,
    pub size: usize,
    pub members: Vec<CustomerId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CentralityReport {
    pub graph_stats: GraphStats,
    /// Highest PageRank first.
    pub customers: Vec<CustomerCentrality>,
    /// Largest first.
    pub communities: Vec<CommunityInfo>,
    pub modularity: f64,
    /// Customers updated in Neo4j, when written back.
    pub written: Option<usize>,
    pub computation_ms: u64,
    pub run_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FraudReport {
    pub alerts: Vec<FraudAlert>,
    pub summary: FraudSummary,
    /// Orders flagged in Neo4j, when written back.
    pub flagged_orders: Option<usize>,
    pub computation_ms: u64,
    pub run_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecommendationReport {
    pub customer_id: CustomerId,
    pub recommendations: Vec<Recommendation>,
    pub run_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PathReport {
    pub from: CustomerId,
    pub to: CustomerId,
    /// `None` when the customers are not connected.
    pub path: Option<Vec<CustomerId>>,
    pub cost: Option<f64>,
    pub run_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InfluenceReport {
    pub products: Vec<InfluenceEntry>,
    /// Strongest co-purchase pairs.
    pub top_pairs: Vec<CoPurchaseRecord>,
    pub run_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SameDayReport {
    pub threshold: f64,
    pub days: Vec<SameDayRecord>,
    pub run_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_request_tagging() {
        let req: QueryRequest =
            serde_json::from_str(r#"{"op": "recommend", "customer_id": 7}"#).unwrap();
        assert_eq!(
            req,
            QueryRequest::Recommend {
                customer_id: CustomerId(7),
                limit: None,
            }
        );

        let req: QueryRequest = serde_json::from_str(r#"{"op": "centrality"}"#).unwrap();
        assert_eq!(req, QueryRequest::Centrality { write: false });

        let req: QueryRequest = serde_json::from_str(r#"{"op": "same_day"}"#).unwrap();
        assert_eq!(req, QueryRequest::SameDay { threshold: None });
    }

    #[test]
    fn test_unknown_op_is_rejected() {
        assert!(serde_json::from_str::<QueryRequest>(r#"{"op": "drop_all"}"#).is_err());
    }

    #[test]
    fn test_response_wraps_result() {
        let resp = QueryResponse::Path(PathReport {
            from: CustomerId(1),
            to: CustomerId(2),
            path: None,
            cost: None,
            run_id: None,
        });
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["op"], "path");
        assert_eq!(json["result"]["from"], 1);
        assert!(json["result"]["path"].is_null());
    }
}
