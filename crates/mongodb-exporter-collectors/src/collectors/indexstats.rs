use async_trait::async_trait;
use mongodb::bson::{doc, Bson, Document};
use tracing::warn;

use crate::collector::{CollectorContext, MetricCollector};
use crate::error::CollectorError;
use crate::metric_set::{as_f64, MetricSet};
use crate::namespace::{resolve_namespaces, Namespace};
use crate::types::CollectorKind;

/// Index usage counters from the `$indexStats` aggregation stage
pub struct IndexStatsCollector {
    ctx: CollectorContext,
    namespaces: Vec<String>,
    discover: bool,
}

impl IndexStatsCollector {
    pub fn new(ctx: CollectorContext, namespaces: Vec<String>, discover: bool) -> Self {
        Self {
            ctx,
            namespaces,
            discover,
        }
    }

    async fn index_stats(&self, ns: &Namespace) -> Result<Vec<Document>, CollectorError> {
        let reply = self
            .ctx
            .connection
            .run_command(
                &ns.database,
                doc! {
                    "aggregate": ns.collection.as_str(),
                    "pipeline": [{ "$indexStats": {} }],
                    "cursor": {},
                },
            )
            .await?;

        let batch = reply
            .get_document("cursor")
            .and_then(|cursor| cursor.get_array("firstBatch"))
            .map_err(|e| CollectorError::unexpected("aggregate", e.to_string()))?;

        Ok(batch
            .iter()
            .filter_map(|entry| match entry {
                Bson::Document(doc) => Some(doc.clone()),
                _ => None,
            })
            .collect())
    }
}

#[async_trait]
impl MetricCollector for IndexStatsCollector {
    fn kind(&self) -> CollectorKind {
        CollectorKind::IndexStats
    }

    async fn collect(&self) -> Result<MetricSet, CollectorError> {
        let namespaces =
            resolve_namespaces(self.ctx.connection.as_ref(), &self.namespaces, self.discover, false).await?;

        let mut set = self.ctx.metric_set();
        for ns in &namespaces {
            let entries = match self.index_stats(ns).await {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(namespace = %ns, error = %e, "$indexStats failed");
                    continue;
                }
            };

            for entry in &entries {
                let Ok(key_name) = entry.get_str("name") else {
                    continue;
                };
                let ops = entry
                    .get_document("accesses")
                    .ok()
                    .and_then(|accesses| accesses.get("ops"))
                    .and_then(as_f64);
                if let Some(ops) = ops {
                    set.gauge(
                        "mongodb_indexstats_accesses_ops",
                        "Number of operations that used the index",
                        &[
                            ("database", ns.database.as_str()),
                            ("collection", ns.collection.as_str()),
                            ("key_name", key_name),
                        ],
                        ops,
                    )?;
                }
            }
        }
        Ok(set)
    }
}
