//! CLI entry point for relgraph-analytics.
//!
//! Every command prints a JSON result to stdout. `query` reads a tagged
//! request from stdin for subprocess callers.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use relgraph_core::{AppConfig, CustomerId};
use relgraph_etl::derive::DeriveSettings;
use relgraph_graph::{GraphClient, GraphConfig};

use relgraph_analytics::{AnalyticsEngine, DataSource, QueryRequest};

#[derive(Parser)]
#[command(name = "relgraph-analytics")]
#[command(about = "Centrality, fraud detection and recommendations over the retail graph")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file prefix (default: relgraph).
    #[arg(short, long, default_value = "relgraph", global = true)]
    config: String,

    /// Analyse a dataset file offline instead of connecting to Neo4j.
    #[arg(long, global = true)]
    dataset: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// PageRank, betweenness and communities over customer similarity.
    Centrality {
        /// Store scores on Customer nodes.
        #[arg(long)]
        write: bool,
    },
    /// Run the fraud patterns.
    Fraud {
        /// Flag alerted orders in Neo4j.
        #[arg(long)]
        write: bool,
    },
    /// Recommend products for a customer.
    Recommend {
        #[arg(long)]
        customer: i64,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Strongest-similarity path between two customers.
    Path {
        #[arg(long)]
        from: i64,
        #[arg(long)]
        to: i64,
    },
    /// Products ranked by co-purchase pull.
    Influence {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Customer-days with high combined order value.
    SameDay {
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Run a JSON request read from stdin.
    Query,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let app = AppConfig::load(&cli.config)?;

    let source = match &cli.dataset {
        Some(path) => DataSource::from_file(path)?,
        None => DataSource::Neo4j(GraphClient::connect(&GraphConfig::from(&app.neo4j)).await?),
    };
    let engine = AnalyticsEngine::new(source, app.analytics.clone())
        .with_derive_settings(DeriveSettings::from(&app.etl))
        .with_batch_size(app.etl.batch_size)
        .with_ledger_dir(app.ledger_dir.clone());

    let output = match cli.command {
        Command::Centrality { write } => serde_json::to_string(&engine.run_centrality(write).await?)?,
        Command::Fraud { write } => serde_json::to_string(&engine.detect_fraud(write).await?)?,
        Command::Recommend { customer, limit } => {
            serde_json::to_string(&engine.recommend(CustomerId(customer), limit).await?)?
        }
        Command::Path { from, to } => serde_json::to_string(
            &engine.shortest_path(CustomerId(from), CustomerId(to)).await?,
        )?,
        Command::Influence { limit } => serde_json::to_string(&engine.influence(limit).await?)?,
        Command::SameDay { threshold } => serde_json::to_string(&engine.same_day(threshold).await?)?,
        Command::Query => {
            let input = std::io::read_to_string(std::io::stdin())?;
            let request: QueryRequest = serde_json::from_str(&input)?;
            serde_json::to_string(&engine.query(request).await?)?
        }
    };
    println!("{output}");

    Ok(())
}
