use async_trait::async_trait;
use mongodb::bson::{doc, Bson};
use tracing::debug;

use crate::collector::{CollectorContext, MetricCollector};
use crate::error::CollectorError;
use crate::metric_set::{as_f64, metric_name, MetricSet};
use crate::namespace::Namespace;
use crate::types::CollectorKind;

/// Per-namespace operation timings from `top`
pub struct TopCollector {
    ctx: CollectorContext,
}

impl TopCollector {
    pub fn new(ctx: CollectorContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl MetricCollector for TopCollector {
    fn kind(&self) -> CollectorKind {
        CollectorKind::Top
    }

    async fn collect(&self) -> Result<MetricSet, CollectorError> {
        let reply = self
            .ctx
            .connection
            .run_command("admin", doc! { "top": 1 })
            .await?;
        let totals = reply
            .get_document("totals")
            .map_err(|e| CollectorError::unexpected("top", e.to_string()))?;

        let mut set = self.ctx.metric_set();
        for (ns, ops) in totals {
            // "note" is a free-text explanation, not a namespace
            let Bson::Document(ops) = ops else {
                continue;
            };
            let Ok(ns) = Namespace::parse(ns) else {
                debug!(namespace = %ns, "Skipping top entry");
                continue;
            };
            let labels = [
                ("database", ns.database.as_str()),
                ("collection", ns.collection.as_str()),
            ];

            for (op, stats) in ops {
                let Bson::Document(stats) = stats else {
                    continue;
                };
                for field in ["time", "count"] {
                    if let Some(value) = stats.get(field).and_then(as_f64) {
                        let name = metric_name("top", &format!("{op}_{field}"));
                        set.gauge(&name, &format!("top {op}.{field}"), &labels, value)?;
                    }
                }
            }
        }
        Ok(set)
    }
}
