//! Collector capability shared by every statistics source

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::connection::Connection;
use crate::error::CollectorError;
use crate::metric_set::MetricSet;
use crate::topology::TopologyInfo;
use crate::types::CollectorKind;

/// One source of metrics, built fresh for every scrape.
///
/// `collect` both describes and samples: the returned [`MetricSet`] carries
/// names, help text and values together.
#[async_trait]
pub trait MetricCollector: Send + Sync {
    /// Which collector this is
    fn kind(&self) -> CollectorKind;

    /// Name used for registration and logging
    fn name(&self) -> &'static str {
        self.kind().as_label()
    }

    /// Query the backend and produce the current samples
    async fn collect(&self) -> Result<MetricSet, CollectorError>;
}

/// What every backend-facing collector is constructed with
#[derive(Clone)]
pub struct CollectorContext {
    pub connection: Arc<dyn Connection>,
    pub topology: Option<TopologyInfo>,
    pub compatible_mode: bool,
}

impl CollectorContext {
    pub fn new(connection: Arc<dyn Connection>, topology: Option<TopologyInfo>, compatible_mode: bool) -> Self {
        Self {
            connection,
            topology,
            compatible_mode,
        }
    }

    /// Labels derived from the topology, empty when it is unknown
    pub fn base_labels(&self) -> HashMap<String, String> {
        self.topology
            .as_ref()
            .map(TopologyInfo::labels)
            .unwrap_or_default()
    }

    /// An empty set pre-loaded with [`Self::base_labels`]
    pub fn metric_set(&self) -> MetricSet {
        MetricSet::new(self.base_labels())
    }

    pub fn is_router(&self) -> bool {
        self.topology.as_ref().is_some_and(TopologyInfo::is_router)
    }
}
