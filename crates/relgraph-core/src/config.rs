//! Configuration management for relgraph services.
//!
//! Configuration is loaded from (in priority order):
//! 1. Environment variables (`RELGRAPH__` prefix, `__` separator)
//! 2. Config file (`relgraph.toml`, or whatever prefix `--config` names)
//! 3. Defaults

use serde::Deserialize;

use crate::error::Result;

/// Top-level configuration shared by the ETL and analytics binaries.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub neo4j: Neo4jSettings,

    #[serde(default)]
    pub etl: EtlSettings,

    #[serde(default)]
    pub analytics: AnalyticsSettings,

    /// Directory for run ledger storage.
    #[serde(default = "default_ledger_dir")]
    pub ledger_dir: String,
}

impl AppConfig {
    /// Load configuration from `{file_prefix}.toml` (optional) and the environment.
    pub fn load(file_prefix: &str) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(file_prefix).required(false))
            .add_source(
                config::Environment::with_prefix("RELGRAPH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let app: AppConfig = cfg.try_deserialize()?;
        tracing::debug!(uri = %app.neo4j.uri, ledger_dir = %app.ledger_dir, "Configuration loaded");
        Ok(app)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            neo4j: Neo4jSettings::default(),
            etl: EtlSettings::default(),
            analytics: AnalyticsSettings::default(),
            ledger_dir: default_ledger_dir(),
        }
    }
}

/// `[neo4j]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct Neo4jSettings {
    #[serde(default = "default_uri")]
    pub uri: String,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default = "default_password")]
    pub password: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_fetch_size")]
    pub fetch_size: usize,
}

impl Default for Neo4jSettings {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            user: default_user(),
            password: default_password(),
            max_connections: default_max_connections(),
            fetch_size: default_fetch_size(),
        }
    }
}

/// `[etl]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct EtlSettings {
    /// Rows per write transaction.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Wipe the graph before loading.
    #[serde(default = "default_true")]
    pub clear_before_load: bool,

    /// Minimum shared-purchase strength for a `SIMILAR_TO` relation.
    #[serde(default = "default_min_two")]
    pub min_common_products: u32,

    /// Minimum co-purchase frequency for a `CO_PURCHASED` relation.
    #[serde(default = "default_min_two")]
    pub min_co_purchases: u32,

    /// Total spend strictly above which a customer is VIP.
    #[serde(default = "default_vip_threshold")]
    pub vip_threshold: f64,

    /// Total spend strictly above which a customer is Premium.
    #[serde(default = "default_premium_threshold")]
    pub premium_threshold: f64,

    /// Reload interval for `watch` mode, in seconds.
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
}

impl Default for EtlSettings {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            clear_before_load: true,
            min_common_products: default_min_two(),
            min_co_purchases: default_min_two(),
            vip_threshold: default_vip_threshold(),
            premium_threshold: default_premium_threshold(),
            interval_secs: default_interval(),
        }
    }
}

/// `[analytics]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsSettings {
    #[serde(default = "default_damping")]
    pub pagerank_damping: f64,
    #[serde(default = "default_tolerance")]
    pub pagerank_tolerance: f64,
    #[serde(default = "default_max_iterations")]
    pub pagerank_max_iterations: usize,

    #[serde(default = "default_resolution")]
    pub louvain_resolution: f64,
    /// Use `SIMILAR_TO.strength` as the Louvain edge weight instead of 1.
    #[serde(default)]
    pub weighted_communities: bool,

    #[serde(default = "default_same_day_threshold")]
    pub same_day_threshold: f64,
    #[serde(default = "default_min_two_usize")]
    pub same_day_min_orders: usize,
    #[serde(default = "default_spike_multiplier")]
    pub spike_multiplier: f64,
    #[serde(default = "default_spike_min_history")]
    pub spike_min_history: usize,
    #[serde(default = "default_discount_threshold")]
    pub discount_threshold: f64,
    #[serde(default = "default_discount_min_amount")]
    pub discount_min_amount: f64,

    #[serde(default = "default_recommendation_limit")]
    pub recommendation_limit: usize,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            pagerank_damping: default_damping(),
            pagerank_tolerance: default_tolerance(),
            pagerank_max_iterations: default_max_iterations(),
            louvain_resolution: default_resolution(),
            weighted_communities: false,
            same_day_threshold: default_same_day_threshold(),
            same_day_min_orders: default_min_two_usize(),
            spike_multiplier: default_spike_multiplier(),
            spike_min_history: default_spike_min_history(),
            discount_threshold: default_discount_threshold(),
            discount_min_amount: default_discount_min_amount(),
            recommendation_limit: default_recommendation_limit(),
        }
    }
}

fn default_ledger_dir() -> String {
    "./ledger".to_string()
}

fn default_uri() -> String {
    "bolt://localhost:7687".to_string()
}

fn default_user() -> String {
    "neo4j".to_string()
}

fn default_password() -> String {
    "password".to_string()
}

fn default_max_connections() -> u32 {
    16
}

fn default_fetch_size() -> usize {
    256
}

fn default_batch_size() -> usize {
    500
}

fn default_true() -> bool {
    true
}

fn default_min_two() -> u32 {
    2
}

fn default_min_two_usize() -> usize {
    2
}

fn default_vip_threshold() -> f64 {
    5000.0
}

fn default_premium_threshold() -> f64 {
    2000.0
}

fn default_interval() -> u64 {
    3600
}

fn default_damping() -> f64 {
    0.85
}

fn default_tolerance() -> f64 {
    1e-6
}

fn default_max_iterations() -> usize {
    100
}

fn default_resolution() -> f64 {
    1.0
}

fn default_same_day_threshold() -> f64 {
    5000.0
}

fn default_spike_multiplier() -> f64 {
    3.0
}

fn default_spike_min_history() -> usize {
    3
}

fn default_discount_threshold() -> f64 {
    0.25
}

fn default_discount_min_amount() -> f64 {
    2000.0
}

fn default_recommendation_limit() -> usize {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.neo4j.uri, "bolt://localhost:7687");
        assert_eq!(config.etl.batch_size, 500);
        assert_eq!(config.etl.min_common_products, 2);
        assert!(config.etl.clear_before_load);
        assert!((config.analytics.pagerank_damping - 0.85).abs() < f64::EPSILON);
        assert_eq!(config.ledger_dir, "./ledger");
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("does-not-exist");
        let config = AppConfig::load(prefix.to_str().unwrap()).unwrap();
        assert_eq!(config.etl.interval_secs, 3600);
        assert_eq!(config.analytics.recommendation_limit, 10);
    }

    #[test]
    fn test_file_overrides_partial_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relgraph.toml");
        std::fs::write(
            &path,
            r#"
ledger_dir = "/var/lib/relgraph/ledger"

[etl]
batch_size = 50
min_common_products = 3

[analytics]
weighted_communities = true
"#,
        )
        .unwrap();

        let prefix = dir.path().join("relgraph");
        let config = AppConfig::load(prefix.to_str().unwrap()).unwrap();
        assert_eq!(config.ledger_dir, "/var/lib/relgraph/ledger");
        assert_eq!(config.etl.batch_size, 50);
        assert_eq!(config.etl.min_common_products, 3);
        assert_eq!(config.etl.min_co_purchases, 2);
        assert!(config.analytics.weighted_communities);
        assert_eq!(config.neo4j.user, "neo4j");
    }

    #[test]
    fn test_bad_value_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.toml"), "[etl]\nbatch_size = \"lots\"\n").unwrap();

        let prefix = dir.path().join("broken");
        assert!(matches!(
            AppConfig::load(prefix.to_str().unwrap()),
            Err(crate::RelgraphError::Config(_))
        ));
    }
}
