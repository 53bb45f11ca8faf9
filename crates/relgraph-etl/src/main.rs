//! CLI entry point for the relgraph-etl loader.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use relgraph_core::AppConfig;
use relgraph_graph::{GraphClient, GraphConfig};

use relgraph_etl::dataset::{self, SampleSpec};
use relgraph_etl::pipeline::{self, EtlPipeline};
use relgraph_etl::scheduler::{run_from_file, EtlScheduler};

#[derive(Parser)]
#[command(name = "relgraph-etl")]
#[command(about = "Load a relational retail dataset into the Neo4j graph")]
struct Cli {
    /// Config file prefix (default: relgraph).
    #[arg(short, long, default_value = "relgraph", global = true)]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load a dataset file into Neo4j once.
    Load {
        #[arg(short, long)]
        dataset: PathBuf,

        /// Keep existing graph contents instead of clearing first.
        #[arg(long)]
        no_clear: bool,
    },
    /// Write a synthetic sample dataset.
    Generate {
        #[arg(short, long)]
        out: PathBuf,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        #[arg(long, default_value_t = 100)]
        customers: usize,

        #[arg(long, default_value_t = 20)]
        products: usize,

        #[arg(long, default_value_t = 200)]
        orders: usize,
    },
    /// Reload a dataset file on the configured interval.
    Watch {
        #[arg(short, long)]
        dataset: PathBuf,
    },
    /// Validate and derive offline; print the report without touching Neo4j.
    Plan {
        #[arg(short, long)]
        dataset: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .json()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let app = AppConfig::load(&cli.config)?;

    match cli.command {
        Command::Load { dataset, no_clear } => {
            let mut settings = app.etl.clone();
            if no_clear {
                settings.clear_before_load = false;
            }
            let pipeline = connect_pipeline(&app, settings).await?;
            let report = run_from_file(&pipeline, &dataset).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Generate {
            out,
            seed,
            customers,
            products,
            orders,
        } => {
            let spec = SampleSpec {
                customers,
                products,
                orders,
            };
            let ds = dataset::generate_sample(&spec, seed);
            dataset::save_dataset(&out, &ds)?;
            tracing::info!(
                path = %out.display(),
                seed,
                customers,
                products,
                orders,
                "Sample dataset written"
            );
        }
        Command::Watch { dataset } => {
            let interval_secs = app.etl.interval_secs;
            let pipeline = connect_pipeline(&app, app.etl.clone()).await?;
            EtlScheduler::new(pipeline, dataset, interval_secs).run().await?;
        }
        Command::Plan { dataset } => {
            let ds = dataset::load_dataset(&dataset)?;
            let report = pipeline::plan(ds, &app.etl, &dataset.display().to_string());
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

async fn connect_pipeline(
    app: &AppConfig,
    settings: relgraph_core::config::EtlSettings,
) -> anyhow::Result<EtlPipeline> {
    let graph = GraphClient::connect(&GraphConfig::from(&app.neo4j)).await?;
    Ok(EtlPipeline::new(graph, settings, app.ledger_dir.clone()))
}
