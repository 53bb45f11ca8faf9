//! relgraph-graph: Neo4j client for the retail graph.
//!
//! This crate is the single access point to the graph store. The ETL writes
//! through it and the analytics engine reads (and writes scores back)
//! through it.

pub mod client;
pub mod mutations;
pub mod queries;

pub use client::{GraphClient, GraphConfig, GraphError};
pub use mutations::{CustomerScore, OrderFlag};
pub use queries::{CoPurchaseRecord, SameDayRecord};
