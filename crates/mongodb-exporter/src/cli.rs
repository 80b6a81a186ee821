//! Command-line flags.
//!
//! Flags override the configuration file, which overrides the defaults.
//! Environment overrides (`MONGODB_URI` and friends) sit between the two.

use clap::Parser;
use mongodb_exporter_config::{ConfigLoader, ConfigResult, ExporterConfig, Validator};
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(name = "mongodb_exporter")]
#[command(version, about = "Prometheus exporter for MongoDB")]
pub struct Cli {
    /// Configuration file (TOML or JSON)
    #[arg(long, value_name = "PATH", env = "MONGODB_EXPORTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// MongoDB connection URI
    #[arg(long = "mongodb.uri", value_name = "URI")]
    pub mongodb_uri: Option<String>,

    /// Connect directly to the given host instead of discovering the topology
    #[arg(long = "mongodb.direct-connect", value_name = "BOOL")]
    pub direct_connect: Option<bool>,

    /// Reuse one connection for all scrapes
    #[arg(long = "mongodb.global-conn-pool")]
    pub global_conn_pool: bool,

    /// Connect timeout per scrape in milliseconds
    #[arg(long = "mongodb.connect-timeout-ms", value_name = "MS")]
    pub connect_timeout_ms: Option<u64>,

    /// Address to listen on for HTTP requests
    #[arg(long = "web.listen-address", value_name = "ADDR")]
    pub listen_address: Option<String>,

    /// Path under which to expose metrics
    #[arg(long = "web.telemetry-path", value_name = "PATH")]
    pub telemetry_path: Option<String>,

    /// Do not serve the process default registry
    #[arg(long = "no-default-registry")]
    pub no_default_registry: bool,

    /// Enable every collector
    #[arg(long = "collect-all")]
    pub collect_all: bool,

    #[arg(long = "collector.diagnosticdata")]
    pub diagnostic_data: bool,

    #[arg(long = "collector.dbstats")]
    pub db_stats: bool,

    #[arg(long = "collector.collstats")]
    pub coll_stats: bool,

    #[arg(long = "collector.indexstats")]
    pub index_stats: bool,

    #[arg(long = "collector.topmetrics")]
    pub top_metrics: bool,

    #[arg(long = "collector.replicasetstatus")]
    pub replicaset_status: bool,

    /// Discover namespaces instead of using the configured lists
    #[arg(long = "discovering-mode")]
    pub discovering_mode: bool,

    /// Also expose metric names used by older exporters
    #[arg(long = "compatible-mode")]
    pub compatible_mode: bool,

    /// Comma separated `db.collection` (or `db`) list for collStats
    #[arg(long = "mongodb.collstats-colls", value_delimiter = ',', value_name = "NS")]
    pub collstats_colls: Vec<String>,

    /// Comma separated `db.collection` list for $indexStats
    #[arg(long = "mongodb.indexstats-colls", value_delimiter = ',', value_name = "NS")]
    pub indexstats_colls: Vec<String>,

    /// Skip collStats and $indexStats when there are at least this many collections (0 = no limit)
    #[arg(long = "collector.collstats-limit", value_name = "N")]
    pub collstats_limit: Option<u64>,

    /// Log level or filter directives
    #[arg(long = "log.level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Log format: pretty, compact or json
    #[arg(long = "log.format", value_name = "FORMAT")]
    pub log_format: Option<String>,
}

impl Cli {
    /// Load the file (if any), apply environment overrides, then flags, and validate
    pub async fn load_config(&self) -> ConfigResult<ExporterConfig> {
        let mut config = match &self.config {
            Some(path) => ConfigLoader::without_validation().load_with_overrides(path).await?,
            None => {
                let mut config = ExporterConfig::default();
                ConfigLoader::new().apply_env_overrides(&mut config)?;
                config
            }
        };
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Overlay the flags that were given onto `config`
    pub fn apply(&self, config: &mut ExporterConfig) {
        if let Some(uri) = &self.mongodb_uri {
            config.mongodb.uri = uri.clone();
        }
        if let Some(direct) = self.direct_connect {
            config.mongodb.direct_connect = direct;
        }
        if let Some(ms) = self.connect_timeout_ms {
            config.mongodb.connect_timeout_ms = ms;
        }
        config.mongodb.global_conn_pool |= self.global_conn_pool;

        if let Some(addr) = &self.listen_address {
            config.web.listen_address = addr.clone();
        }
        if let Some(path) = &self.telemetry_path {
            config.web.telemetry_path = path.clone();
        }
        config.web.disable_default_registry |= self.no_default_registry;

        let collectors = &mut config.collectors;
        collectors.collect_all |= self.collect_all;
        collectors.enable_diagnostic_data |= self.diagnostic_data;
        collectors.enable_db_stats |= self.db_stats;
        collectors.enable_coll_stats |= self.coll_stats;
        collectors.enable_index_stats |= self.index_stats;
        collectors.enable_top_metrics |= self.top_metrics;
        collectors.enable_replicaset_status |= self.replicaset_status;
        collectors.discovering_mode |= self.discovering_mode;
        collectors.compatible_mode |= self.compatible_mode;
        if !self.collstats_colls.is_empty() {
            collectors.coll_stats_namespaces = self.collstats_colls.clone();
        }
        if !self.indexstats_colls.is_empty() {
            collectors.index_stats_collections = self.indexstats_colls.clone();
        }
        if let Some(limit) = self.collstats_limit {
            collectors.coll_stats_limit = limit;
        }

        if let Some(level) = &self.log_level {
            config.logging.level = Some(level.clone());
        }
        if let Some(format) = &self.log_format {
            config.logging.format = format.clone();
        }
    }
}
