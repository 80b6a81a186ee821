use async_trait::async_trait;
use mongodb::bson::doc;
use tracing::warn;

use crate::collector::{CollectorContext, MetricCollector};
use crate::error::CollectorError;
use crate::metric_set::MetricSet;
use crate::namespace::is_system_database;
use crate::types::CollectorKind;

/// `dbStats` for every user database, labelled by `database`
pub struct DbStatsCollector {
    ctx: CollectorContext,
}

impl DbStatsCollector {
    pub fn new(ctx: CollectorContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl MetricCollector for DbStatsCollector {
    fn kind(&self) -> CollectorKind {
        CollectorKind::DbStats
    }

    async fn collect(&self) -> Result<MetricSet, CollectorError> {
        let connection = &self.ctx.connection;
        let mut databases = connection.list_database_names().await?;
        databases.retain(|db| !is_system_database(db));
        databases.sort();

        let mut set = self.ctx.metric_set();
        for database in &databases {
            match connection
                .run_command(database, doc! { "dbStats": 1, "scale": 1 })
                .await
            {
                Ok(stats) => {
                    set.flatten("dbstats", &stats, &[("database", database.as_str())]);
                }
                Err(e) => warn!(database = %database, error = %e, "dbStats failed"),
            }
        }
        Ok(set)
    }
}
