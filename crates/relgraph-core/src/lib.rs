//! relgraph-core: Shared types, configuration, and error handling for relgraph.
//!
//! This crate provides the foundational types used across all relgraph components:
//! - Relational rows (Customer, Product, Order) read by the ETL
//! - Graph vocabulary (node labels, relationship types) written to Neo4j
//! - Derived relations and customer metrics
//! - Configuration management
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use error::RelgraphError;
pub use types::{
    Category, CoPurchase, Customer, CustomerId, CustomerMetrics, CustomerTier, Dataset, NodeLabel,
    Order, OrderId, Product, ProductId, RelType, Similarity,
};
