//! Where the analytics engine reads its data from.

use std::path::Path;

use relgraph_core::Dataset;
use relgraph_etl::derive::DeriveSettings;
use relgraph_etl::{dataset, RetailGraph};
use relgraph_graph::GraphClient;

use crate::error::Result;

/// A live graph store, or a dataset held in memory for offline analysis.
pub enum DataSource {
    Neo4j(GraphClient),
    Dataset(Dataset),
}

impl DataSource {
    pub fn from_file(path: &Path) -> Result<Self> {
        Ok(Self::Dataset(dataset::load_dataset(path)?))
    }

    pub fn client(&self) -> Option<&GraphClient> {
        match self {
            DataSource::Neo4j(client) => Some(client),
            DataSource::Dataset(_) => None,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            DataSource::Neo4j(_) => "neo4j",
            DataSource::Dataset(_) => "dataset",
        }
    }
}

/// Build the retail graph from the source. Relations and metrics are
/// derived with the same settings the ETL uses, so a graph loaded from a
/// dataset analyses the same as the dataset itself.
pub async fn fetch_model(source: &DataSource, settings: &DeriveSettings) -> Result<RetailGraph> {
    let dataset = match source {
        DataSource::Neo4j(client) => client.fetch_dataset().await?,
        DataSource::Dataset(ds) => ds.clone(),
    };
    Ok(RetailGraph::build(dataset, settings))
}
