//! Error types for the relgraph-etl crate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Graph error: {0}")]
    Graph(#[from] relgraph_graph::GraphError),

    #[error("Invalid dataset {path}: {reason}")]
    Dataset { path: String, reason: String },

    #[error("Dataset has no valid rows to load")]
    EmptyDataset,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EtlError>;
