//! relgraph-etl: Relational-to-graph loader for the retail graph.
//!
//! Reads a relational dataset (customers, products, orders), validates it,
//! derives similarity and co-purchase relations plus customer metrics, and
//! writes the result to Neo4j. Every load is recorded in the run ledger.

pub mod dataset;
pub mod derive;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod model;
pub mod persist;
pub mod pipeline;
pub mod scheduler;
pub mod validate;

pub use error::{EtlError, Result};
pub use model::{GraphStats, RetailGraph};
pub use pipeline::{EtlPipeline, LoadReport};
