//! Error types for the relgraph-analytics crate.

use thiserror::Error;

use relgraph_core::CustomerId;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Graph error: {0}")]
    Graph(#[from] relgraph_graph::GraphError),

    #[error("ETL error: {0}")]
    Etl(#[from] relgraph_etl::EtlError),

    #[error("Customer not found: {0}")]
    CustomerNotFound(CustomerId),

    #[error("Graph has no customers to analyse")]
    EmptyGraph,

    #[error("Write-back needs a Neo4j source; offline datasets are read-only")]
    WriteBackUnavailable,
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;
