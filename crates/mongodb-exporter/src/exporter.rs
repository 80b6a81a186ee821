// Copyright (C) 2026  winnyboy5
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.
//! Per-scrape orchestration.
//!
//! One [`Exporter`] is built at startup and shared by every request. A scrape
//! runs strictly in order: connect, count collections if still unknown,
//! classify the node, build the request registry, gather. All of it shares
//! one deadline taken from the connect timeout. Per-scrape connections are
//! released on every exit path.

use mongodb_exporter_collectors::{
    Connection, ConnectionError, Connector, MetricFamily, MongoConnector, RegistryBuilder,
    TopologyInfo,
};
use mongodb_exporter_config::ExporterConfig;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info, warn};

use crate::connection::{ConnectionManager, ScrapeConnection};
use crate::counter::CollectionCounter;
use crate::metrics;

/// Failures that turn a scrape into an error response
#[derive(Error, Debug)]
pub enum ScrapeError {
    /// The node answered the connect but not the topology query
    #[error("{0}")]
    Topology(ConnectionError),
}

/// Long-lived exporter state shared by all requests
pub struct Exporter {
    config: Arc<ExporterConfig>,
    connections: ConnectionManager,
    counter: CollectionCounter,
    builder: RegistryBuilder,
}

impl Exporter {
    /// Exporter talking to the MongoDB deployment named in `config`
    pub fn new(config: ExporterConfig) -> Self {
        let connector = MongoConnector::new(config.mongodb.uri.clone(), config.mongodb.direct_connect);
        Self::with_connector(config, Arc::new(connector))
    }

    /// Exporter using a caller-supplied connector
    pub fn with_connector(config: ExporterConfig, connector: Arc<dyn Connector>) -> Self {
        metrics::init();
        let connections = ConnectionManager::new(connector, config.mongodb.global_conn_pool);
        let builder = RegistryBuilder::new(&config.collectors);
        Self {
            config: Arc::new(config),
            connections,
            counter: CollectionCounter::new(),
            builder,
        }
    }

    pub fn config(&self) -> &ExporterConfig {
        &self.config
    }

    pub fn connections(&self) -> &ConnectionManager {
        &self.connections
    }

    pub fn counter(&self) -> &CollectionCounter {
        &self.counter
    }

    /// Try to connect once in the background.
    ///
    /// Fills the shared slot when pooling is on. Failure is only logged;
    /// scrapes never wait for this task.
    pub fn spawn_warmup(self: &Arc<Self>) -> JoinHandle<()> {
        let exporter = Arc::clone(self);
        tokio::spawn(async move {
            match exporter.connect(exporter.deadline()).await {
                Some(lease) => {
                    info!(pooled = exporter.connections.is_pooled(), "Connected to MongoDB");
                    lease.release().await;
                }
                None => warn!("Initial connection to MongoDB failed, will retry on scrape"),
            }
        })
    }

    /// Run one scrape and return every metric family to serve
    pub async fn scrape(&self) -> Result<Vec<MetricFamily>, ScrapeError> {
        let deadline = self.deadline();
        let lease = self.connect(deadline).await;
        let connection = lease.as_ref().map(ScrapeConnection::connection);

        let result = self.collect(connection, deadline).await;

        if let Some(lease) = lease {
            lease.release().await;
        }
        metrics::inc_scrape(if result.is_ok() { "success" } else { "error" });
        result
    }

    fn deadline(&self) -> Instant {
        Instant::now() + self.config.mongodb.connect_timeout()
    }

    async fn connect(&self, deadline: Instant) -> Option<ScrapeConnection> {
        match self.connections.acquire(deadline).await {
            Ok(lease) => Some(lease),
            Err(e) => {
                metrics::inc_connect_failure();
                error!(uri = %self.config.mongodb.redacted_uri(), error = %e, "Cannot connect to MongoDB");
                None
            }
        }
    }

    async fn collect(
        &self,
        connection: Option<Arc<dyn Connection>>,
        deadline: Instant,
    ) -> Result<Vec<MetricFamily>, ScrapeError> {
        let topology = match &connection {
            Some(conn) => {
                if timeout_at(deadline, self.counter.refresh_if_unknown(conn.as_ref()))
                    .await
                    .is_err()
                {
                    warn!("Collection count did not finish before the scrape deadline");
                }
                let topology = timeout_at(deadline, TopologyInfo::resolve(conn.as_ref()))
                    .await
                    .unwrap_or(Err(ConnectionError::Timeout("topology query")))
                    .map_err(|e| {
                        error!(error = %e, "Cannot get topology info");
                        ScrapeError::Topology(e)
                    })?;
                debug!(node_type = topology.node_type.as_label(), "Resolved topology");
                Some(topology)
            }
            None => None,
        };

        let count = self.counter.cached();
        let registry = self
            .builder
            .build_until(connection, topology.as_ref(), count, Some(deadline));
        let mut families = registry.gather_until(Some(deadline)).await;

        if !self.config.web.disable_default_registry {
            families.extend(prometheus::gather());
        }
        Ok(families)
    }
}
