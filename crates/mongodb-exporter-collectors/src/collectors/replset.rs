use async_trait::async_trait;
use mongodb::bson::{doc, Bson};
use tracing::debug;

use crate::collector::{CollectorContext, MetricCollector};
use crate::error::{CollectorError, ConnectionError};
use crate::metric_set::MetricSet;
use crate::types::CollectorKind;

/// `NoReplicationEnabled`
const NO_REPLICATION_ENABLED: i32 = 76;
/// `NotYetInitialized`
const NOT_YET_INITIALIZED: i32 = 94;

/// Per-member health and state from `replSetGetStatus`
pub struct ReplSetStatusCollector {
    ctx: CollectorContext,
}

impl ReplSetStatusCollector {
    pub fn new(ctx: CollectorContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl MetricCollector for ReplSetStatusCollector {
    fn kind(&self) -> CollectorKind {
        CollectorKind::ReplSetStatus
    }

    async fn collect(&self) -> Result<MetricSet, CollectorError> {
        let mut set = self.ctx.metric_set();

        let status = match self
            .ctx
            .connection
            .run_command("admin", doc! { "replSetGetStatus": 1 })
            .await
        {
            Ok(status) => status,
            Err(e) if is_not_replicating(&e) => {
                debug!(error = %e, "Node is not part of an initialized replica set");
                return Ok(set);
            }
            Err(e) => return Err(e.into()),
        };

        let members = status
            .get_array("members")
            .map_err(|e| CollectorError::unexpected("replSetGetStatus", e.to_string()))?;

        for member in members {
            let Bson::Document(member) = member else {
                continue;
            };
            let Ok(name) = member.get_str("name") else {
                continue;
            };
            set.flatten("rs_members", member, &[("member_idx", name)]);
        }
        Ok(set)
    }
}

fn is_not_replicating(err: &ConnectionError) -> bool {
    matches!(err.code(), Some(NO_REPLICATION_ENABLED | NOT_YET_INITIALIZED))
}
