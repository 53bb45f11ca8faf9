//! Periodic reload of a dataset file.
//!
//! Each tick re-reads the file and runs the full pipeline. A failed run is
//! logged and the loop carries on with the next tick.

use std::path::{Path, PathBuf};

use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::dataset;
use crate::error::Result;
use crate::pipeline::{EtlPipeline, LoadReport};

pub struct EtlScheduler {
    pipeline: EtlPipeline,
    dataset_path: PathBuf,
    interval: Duration,
}

impl EtlScheduler {
    pub fn new(pipeline: EtlPipeline, dataset_path: impl Into<PathBuf>, interval_secs: u64) -> Self {
        Self {
            pipeline,
            dataset_path: dataset_path.into(),
            interval: Duration::from_secs(interval_secs.max(1)),
        }
    }

    /// Run until the runtime shuts down. The first load starts immediately.
    pub async fn run(&self) -> Result<()> {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            dataset = %self.dataset_path.display(),
            interval_secs = self.interval.as_secs(),
            "Scheduler started"
        );

        loop {
            ticker.tick().await;
            tracing::info!(dataset = %self.dataset_path.display(), "Scheduled load triggered");

            if let Err(e) = run_from_file(&self.pipeline, &self.dataset_path).await {
                tracing::error!(dataset = %self.dataset_path.display(), error = %e, "Scheduled load failed");
            }
        }
    }
}

/// Read a dataset file and load it.
pub async fn run_from_file(pipeline: &EtlPipeline, path: &Path) -> Result<LoadReport> {
    let dataset = dataset::load_dataset(path)?;
    pipeline.run(dataset, &path.display().to_string()).await
}
