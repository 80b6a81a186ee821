use async_trait::async_trait;
use mongodb::bson::doc;
use tracing::warn;

use crate::collector::{CollectorContext, MetricCollector};
use crate::error::CollectorError;
use crate::metric_set::{as_f64, MetricSet};
use crate::namespace::{resolve_namespaces, Namespace};
use crate::types::CollectorKind;

/// Storage-engine sections are huge and mostly constant; they are not exported
const SKIPPED_SECTIONS: [&str; 3] = ["wiredTiger", "indexDetails", "indexSizes"];

/// `collStats` per namespace.
///
/// Namespaces come from the configured list (bare database names expand to
/// their collections) or from discovery when the list is empty.
pub struct CollStatsCollector {
    ctx: CollectorContext,
    namespaces: Vec<String>,
    discover: bool,
}

impl CollStatsCollector {
    pub fn new(ctx: CollectorContext, namespaces: Vec<String>, discover: bool) -> Self {
        Self {
            ctx,
            namespaces,
            discover,
        }
    }

    async fn collect_namespace(&self, set: &mut MetricSet, ns: &Namespace) -> Result<(), CollectorError> {
        let mut stats = self
            .ctx
            .connection
            .run_command(&ns.database, doc! { "collStats": ns.collection.as_str() })
            .await?;

        let labels = [
            ("database", ns.database.as_str()),
            ("collection", ns.collection.as_str()),
        ];

        if let Ok(sizes) = stats.get_document("indexSizes") {
            for (index, size) in sizes {
                if let Some(size) = as_f64(size) {
                    set.gauge(
                        "mongodb_collstats_index_size",
                        "Size of each index of the collection in bytes",
                        &[labels[0], labels[1], ("index", index.as_str())],
                        size,
                    )?;
                }
            }
        }

        for section in SKIPPED_SECTIONS {
            stats.remove(section);
        }
        set.flatten("collstats", &stats, &labels);
        Ok(())
    }
}

#[async_trait]
impl MetricCollector for CollStatsCollector {
    fn kind(&self) -> CollectorKind {
        CollectorKind::CollStats
    }

    async fn collect(&self) -> Result<MetricSet, CollectorError> {
        let namespaces =
            resolve_namespaces(self.ctx.connection.as_ref(), &self.namespaces, self.discover, true).await?;

        let mut set = self.ctx.metric_set();
        for ns in &namespaces {
            if let Err(e) = self.collect_namespace(&mut set, ns).await {
                warn!(namespace = %ns, error = %e, "collStats failed");
            }
        }
        Ok(set)
    }
}
