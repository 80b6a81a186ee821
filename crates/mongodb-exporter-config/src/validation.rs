use crate::error::{ConfigError, ConfigResult};
use crate::schema::*;

/// Validator for configuration settings
pub trait Validator {
    fn validate(&self) -> ConfigResult<()>;
}

impl Validator for ExporterConfig {
    fn validate(&self) -> ConfigResult<()> {
        self.mongodb.validate()?;
        self.web.validate()?;
        self.collectors.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

impl Validator for MongoDbConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.uri.is_empty() {
            return Err(ConfigError::MissingRequired("mongodb.uri".to_string()));
        }

        if !self.uri.starts_with("mongodb://") && !self.uri.starts_with("mongodb+srv://") {
            return Err(ConfigError::invalid_value(
                "mongodb.uri",
                "must start with mongodb:// or mongodb+srv://",
            ));
        }

        if self.connect_timeout_ms == 0 {
            return Err(ConfigError::invalid_value(
                "mongodb.connect_timeout_ms",
                "must be greater than 0",
            ));
        }

        Ok(())
    }
}

impl Validator for WebConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.listen_address.is_empty() {
            return Err(ConfigError::MissingRequired("web.listen_address".to_string()));
        }

        let port = self.listen_address.rsplit(':').next().unwrap_or_default();
        if port.parse::<u16>().is_err() {
            return Err(ConfigError::invalid_value(
                "web.listen_address",
                format!("expected host:port or :port, got {}", self.listen_address),
            ));
        }

        if !self.telemetry_path.starts_with('/') {
            return Err(ConfigError::invalid_value(
                "web.telemetry_path",
                format!("must start with '/', got {}", self.telemetry_path),
            ));
        }

        if self.telemetry_path == "/health" {
            return Err(ConfigError::invalid_value(
                "web.telemetry_path",
                "/health is reserved for the health check",
            ));
        }

        Ok(())
    }
}

impl Validator for CollectorsConfig {
    fn validate(&self) -> ConfigResult<()> {
        for ns in &self.coll_stats_namespaces {
            if !is_valid_namespace(ns, true) {
                return Err(ConfigError::invalid_value(
                    "collectors.coll_stats_namespaces",
                    format!("expected db or db.collection, got '{}'", ns),
                ));
            }
        }

        for ns in &self.index_stats_collections {
            if !is_valid_namespace(ns, false) {
                return Err(ConfigError::invalid_value(
                    "collectors.index_stats_collections",
                    format!("expected db.collection, got '{}'", ns),
                ));
            }
        }

        Ok(())
    }
}

impl Validator for LoggingConfig {
    fn validate(&self) -> ConfigResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        let all_known = self.level.as_deref().is_none_or(|filter| {
            filter.split(',').all(|directive| {
                let level = directive.rsplit('=').next().unwrap_or_default().trim();
                valid_levels.contains(&level.to_lowercase().as_str())
            })
        });
        if !all_known {
            return Err(ConfigError::invalid_value(
                "logging.level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["pretty", "compact", "json"];
        if !valid_formats.contains(&self.format.to_lowercase().as_str()) {
            return Err(ConfigError::invalid_value(
                "logging.format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        Ok(())
    }
}

/// `db.collection`, or a bare `db` when `allow_bare_db` is set.
/// Collection names may themselves contain dots.
fn is_valid_namespace(ns: &str, allow_bare_db: bool) -> bool {
    match ns.split_once('.') {
        Some((db, coll)) => !db.is_empty() && !coll.is_empty(),
        None => allow_bare_db && !ns.is_empty(),
    }
}
