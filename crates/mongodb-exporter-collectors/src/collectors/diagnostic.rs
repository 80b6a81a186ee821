use async_trait::async_trait;
use mongodb::bson::{doc, Document};
use tracing::debug;

use crate::collector::{CollectorContext, MetricCollector};
use crate::error::CollectorError;
use crate::metric_set::{as_f64, MetricSet};
use crate::types::CollectorKind;

/// Sections of `getDiagnosticData` and the prefix each is exported under
const SECTIONS: [(&str, &str); 4] = [
    ("serverStatus", "ss"),
    ("replSetGetStatus", "rs"),
    ("local.oplog.rs.stats", "oplog_stats"),
    ("systemMetrics", "sys"),
];

const OP_COUNTERS: [&str; 6] = ["insert", "query", "update", "delete", "getmore", "command"];

/// Server-wide diagnostics.
///
/// Routers do not implement `getDiagnosticData`; `serverStatus` is used there.
pub struct DiagnosticDataCollector {
    ctx: CollectorContext,
}

impl DiagnosticDataCollector {
    pub fn new(ctx: CollectorContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl MetricCollector for DiagnosticDataCollector {
    fn kind(&self) -> CollectorKind {
        CollectorKind::DiagnosticData
    }

    async fn collect(&self) -> Result<MetricSet, CollectorError> {
        let connection = &self.ctx.connection;
        let mut set = self.ctx.metric_set();

        let server_status = if self.ctx.is_router() {
            let status = connection
                .run_command("admin", doc! { "serverStatus": 1 })
                .await?;
            set.flatten("ss", &status, &[]);
            Some(status)
        } else {
            let reply = connection
                .run_command("admin", doc! { "getDiagnosticData": 1 })
                .await?;
            let data = reply
                .get_document("data")
                .map_err(|e| CollectorError::unexpected("getDiagnosticData", e.to_string()))?;

            for (section, prefix) in SECTIONS {
                match data.get_document(section) {
                    Ok(doc) => {
                        let written = set.flatten(prefix, doc, &[]);
                        debug!(section, written, "Flattened diagnostic section");
                    }
                    Err(_) => debug!(section, "Diagnostic section not present"),
                }
            }
            data.get_document("serverStatus").ok().cloned()
        };

        if self.ctx.compatible_mode {
            if let Some(status) = &server_status {
                legacy_metrics(&mut set, status)?;
            }
        }

        Ok(set)
    }
}

/// Metric names kept for dashboards built against older exporters
fn legacy_metrics(set: &mut MetricSet, status: &Document) -> Result<(), CollectorError> {
    if let Ok(connections) = status.get_document("connections") {
        for state in ["current", "available"] {
            if let Some(value) = connections.get(state).and_then(as_f64) {
                set.gauge(
                    "mongodb_connections",
                    "The number of incoming connections from clients to the database server",
                    &[("state", state)],
                    value,
                )?;
            }
        }
    }

    if let Some(uptime) = status.get("uptime").and_then(as_f64) {
        set.gauge(
            "mongodb_instance_uptime_seconds",
            "The value of the uptime field corresponds to the number of seconds that the mongos or mongod process has been active.",
            &[],
            uptime,
        )?;
    }

    if let Ok(counters) = status.get_document("opcounters") {
        for op in OP_COUNTERS {
            if let Some(value) = counters.get(op).and_then(as_f64) {
                set.counter(
                    "mongodb_op_counters_total",
                    "The opcounters data structure provides an overview of database operations by type",
                    &[("type", op)],
                    value,
                )?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_metrics_from_server_status() {
        let status = doc! {
            "uptime": 3600.0,
            "connections": { "current": 5, "available": 995 },
            "opcounters": { "insert": 10_i64, "query": 20_i64, "command": 3_i64 },
        };
        let mut set = MetricSet::default();
        legacy_metrics(&mut set, &status).unwrap();

        assert!(set.contains("mongodb_connections"));
        assert!(set.contains("mongodb_instance_uptime_seconds"));
        assert!(set.contains("mongodb_op_counters_total"));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_legacy_metrics_tolerate_missing_sections() {
        let mut set = MetricSet::default();
        legacy_metrics(&mut set, &doc! { "host": "db-1" }).unwrap();
        assert!(set.is_empty());
    }
}
