use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::{timeout_at, Instant};
use tracing::warn;

use crate::collector::MetricCollector;
use crate::connection::Connection;
use crate::error::{CollectorError, ConnectionError};
use crate::metric_set::MetricSet;
use crate::types::CollectorKind;

/// Reports whether the backend answers and which exporter build is running.
///
/// Registered on every scrape, including those without a connection.
pub struct GeneralCollector {
    connection: Option<Arc<dyn Connection>>,
    labels: HashMap<String, String>,
    deadline: Option<Instant>,
}

impl GeneralCollector {
    pub fn new(connection: Option<Arc<dyn Connection>>, labels: HashMap<String, String>) -> Self {
        Self {
            connection,
            labels,
            deadline: None,
        }
    }

    /// Report down instead of waiting for a ping past `deadline`
    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    async fn ping(&self, connection: &dyn Connection) -> Result<(), ConnectionError> {
        match self.deadline {
            Some(deadline) => timeout_at(deadline, connection.ping())
                .await
                .unwrap_or(Err(ConnectionError::Timeout("ping"))),
            None => connection.ping().await,
        }
    }
}

#[async_trait]
impl MetricCollector for GeneralCollector {
    fn kind(&self) -> CollectorKind {
        CollectorKind::GeneralStatus
    }

    async fn collect(&self) -> Result<MetricSet, CollectorError> {
        let up = match &self.connection {
            Some(connection) => match self.ping(connection.as_ref()).await {
                Ok(()) => 1.0,
                Err(e) => {
                    warn!(error = %e, "MongoDB ping failed");
                    0.0
                }
            },
            None => 0.0,
        };

        let mut set = MetricSet::new(self.labels.clone());
        set.gauge("mongodb_up", "Whether MongoDB is up.", &[], up)?;
        set.gauge(
            "mongodb_exporter_build_info",
            "Build information of the MongoDB exporter.",
            &[("version", env!("CARGO_PKG_VERSION"))],
            1.0,
        )?;
        Ok(set)
    }
}
