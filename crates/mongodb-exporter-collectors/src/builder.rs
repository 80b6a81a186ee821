//! Per-request collector selection.
//!
//! Which collectors run is a pure function of the settings, the topology and
//! the cached collection count; [`plan_collectors`] computes it and
//! [`RegistryBuilder`] turns the plan into a [`RequestRegistry`].

use mongodb_exporter_config::CollectorsConfig;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::collector::{CollectorContext, MetricCollector};
use crate::collectors::{
    CollStatsCollector, DbStatsCollector, DiagnosticDataCollector, GeneralCollector,
    IndexStatsCollector, ReplSetStatusCollector, TopCollector,
};
use crate::connection::Connection;
use crate::registry::RequestRegistry;
use crate::topology::TopologyInfo;
use crate::types::CollectorKind;

/// Whether per-collection collectors may run.
///
/// A limit of zero means unlimited. Otherwise the count must be known and
/// strictly below the limit; an unknown count is never good enough.
pub fn limits_ok(limit: u64, count: Option<u64>) -> bool {
    limit == 0 || count.is_some_and(|count| count < limit)
}

/// Backend collectors in registration order. The general-status collector
/// always comes first and is not gated.
const GATED: [CollectorKind; 6] = [
    CollectorKind::CollStats,
    CollectorKind::IndexStats,
    CollectorKind::DiagnosticData,
    CollectorKind::DbStats,
    CollectorKind::Top,
    CollectorKind::ReplSetStatus,
];

/// Collectors to register, in registration order.
///
/// `settings` must already have the collect-all shortcut applied
/// (see [`CollectorsConfig::effective`]). An unknown topology is treated as
/// a data-bearing node.
pub fn plan_collectors(
    settings: &CollectorsConfig,
    connected: bool,
    topology: Option<&TopologyInfo>,
    count: Option<u64>,
) -> Vec<CollectorKind> {
    let mut plan = vec![CollectorKind::GeneralStatus];
    if !connected {
        return plan;
    }

    let limits = limits_ok(settings.coll_stats_limit, count);
    let router = topology.is_some_and(TopologyInfo::is_router);

    plan.extend(GATED.into_iter().filter(|&kind| {
        is_enabled(settings, kind)
            && (!kind.is_per_collection() || limits)
            && (!kind.needs_data_node() || !router)
            && has_namespaces(settings, kind)
    }));
    plan
}

fn is_enabled(settings: &CollectorsConfig, kind: CollectorKind) -> bool {
    match kind {
        CollectorKind::GeneralStatus => true,
        CollectorKind::DiagnosticData => settings.enable_diagnostic_data,
        CollectorKind::DbStats => settings.enable_db_stats,
        CollectorKind::CollStats => settings.enable_coll_stats,
        CollectorKind::IndexStats => settings.enable_index_stats,
        CollectorKind::Top => settings.enable_top_metrics,
        CollectorKind::ReplSetStatus => settings.enable_replicaset_status,
    }
}

/// Per-collection collectors need an allow-list or discovery
fn has_namespaces(settings: &CollectorsConfig, kind: CollectorKind) -> bool {
    match kind {
        CollectorKind::CollStats => {
            settings.discovering_mode || !settings.coll_stats_namespaces.is_empty()
        }
        CollectorKind::IndexStats => {
            settings.discovering_mode || !settings.index_stats_collections.is_empty()
        }
        _ => true,
    }
}

/// Builds a fresh [`RequestRegistry`] for every scrape
#[derive(Debug, Clone)]
pub struct RegistryBuilder {
    settings: CollectorsConfig,
}

impl RegistryBuilder {
    /// Capture the settings with the collect-all shortcut resolved
    pub fn new(settings: &CollectorsConfig) -> Self {
        Self {
            settings: settings.effective(),
        }
    }

    pub fn settings(&self) -> &CollectorsConfig {
        &self.settings
    }

    pub fn plan(&self, connected: bool, topology: Option<&TopologyInfo>, count: Option<u64>) -> Vec<CollectorKind> {
        plan_collectors(&self.settings, connected, topology, count)
    }

    /// Assemble the collectors for one request.
    ///
    /// Without a connection only the general-status collector is registered.
    /// A collector that cannot be registered is logged and skipped.
    pub fn build(
        &self,
        connection: Option<Arc<dyn Connection>>,
        topology: Option<&TopologyInfo>,
        count: Option<u64>,
    ) -> RequestRegistry {
        self.build_until(connection, topology, count, None)
    }

    /// [`build`](Self::build) for a scrape that must finish by `deadline`
    pub fn build_until(
        &self,
        connection: Option<Arc<dyn Connection>>,
        topology: Option<&TopologyInfo>,
        count: Option<u64>,
        deadline: Option<Instant>,
    ) -> RequestRegistry {
        let plan = self.plan(connection.is_some(), topology, count);
        debug!(collectors = ?plan, count = ?count, "Collector plan");

        let mut registry = RequestRegistry::new();
        for kind in plan {
            let Some(collector) = self.make(kind, connection.as_ref(), topology, deadline) else {
                continue;
            };
            if let Err(e) = registry.register(collector) {
                warn!(collector = kind.as_label(), error = %e, "Cannot register collector");
            }
        }
        registry
    }

    fn make(
        &self,
        kind: CollectorKind,
        connection: Option<&Arc<dyn Connection>>,
        topology: Option<&TopologyInfo>,
        deadline: Option<Instant>,
    ) -> Option<Box<dyn MetricCollector>> {
        if kind == CollectorKind::GeneralStatus {
            let labels = topology.map(TopologyInfo::labels).unwrap_or_default();
            let general =
                GeneralCollector::new(connection.map(Arc::clone), labels).with_deadline(deadline);
            return Some(Box::new(general));
        }

        let ctx = CollectorContext::new(
            Arc::clone(connection?),
            topology.cloned(),
            self.settings.compatible_mode,
        );
        let discover = self.settings.discovering_mode;

        let collector: Box<dyn MetricCollector> = match kind {
            CollectorKind::GeneralStatus => return None,
            CollectorKind::DiagnosticData => Box::new(DiagnosticDataCollector::new(ctx)),
            CollectorKind::DbStats => Box::new(DbStatsCollector::new(ctx)),
            CollectorKind::CollStats => Box::new(CollStatsCollector::new(
                ctx,
                self.settings.coll_stats_namespaces.clone(),
                discover,
            )),
            CollectorKind::IndexStats => Box::new(IndexStatsCollector::new(
                ctx,
                self.settings.index_stats_collections.clone(),
                discover,
            )),
            CollectorKind::Top => Box::new(TopCollector::new(ctx)),
            CollectorKind::ReplSetStatus => Box::new(ReplSetStatusCollector::new(ctx)),
        };
        Some(collector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::NodeType;

    fn mongos() -> TopologyInfo {
        TopologyInfo {
            node_type: NodeType::Mongos,
            replica_set: None,
            state: None,
        }
    }

    fn all_enabled() -> CollectorsConfig {
        CollectorsConfig {
            enable_diagnostic_data: true,
            enable_db_stats: true,
            enable_coll_stats: true,
            enable_index_stats: true,
            enable_top_metrics: true,
            enable_replicaset_status: true,
            discovering_mode: true,
            coll_stats_limit: 100,
            ..Default::default()
        }
    }

    #[test]
    fn test_limits_ok() {
        assert!(limits_ok(0, None));
        assert!(limits_ok(0, Some(10_000)));
        assert!(!limits_ok(100, None));
        assert!(limits_ok(100, Some(50)));
        assert!(limits_ok(100, Some(0)));
        assert!(!limits_ok(100, Some(100)));
        assert!(!limits_ok(100, Some(150)));
    }

    #[test]
    fn test_no_connection_plans_general_only() {
        let plan = plan_collectors(&all_enabled(), false, None, Some(1));
        assert_eq!(plan, vec![CollectorKind::GeneralStatus]);
    }

    #[test]
    fn test_plan_order() {
        let plan = plan_collectors(&all_enabled(), true, None, Some(1));
        assert_eq!(
            plan,
            vec![
                CollectorKind::GeneralStatus,
                CollectorKind::CollStats,
                CollectorKind::IndexStats,
                CollectorKind::DiagnosticData,
                CollectorKind::DbStats,
                CollectorKind::Top,
                CollectorKind::ReplSetStatus,
            ]
        );
    }

    #[test]
    fn test_limit_gate_follows_count() {
        let settings = all_enabled();
        let unknown = plan_collectors(&settings, true, None, None);
        assert!(!unknown.contains(&CollectorKind::CollStats));
        assert!(!unknown.contains(&CollectorKind::IndexStats));

        let below = plan_collectors(&settings, true, None, Some(50));
        assert!(below.contains(&CollectorKind::CollStats));
        assert!(below.contains(&CollectorKind::IndexStats));

        let above = plan_collectors(&settings, true, None, Some(150));
        assert!(!above.contains(&CollectorKind::CollStats));
        assert!(!above.contains(&CollectorKind::IndexStats));
    }

    #[test]
    fn test_namespace_gate_is_per_collector() {
        let settings = CollectorsConfig {
            discovering_mode: false,
            index_stats_collections: vec!["app.users".to_string()],
            ..all_enabled()
        };
        let plan = plan_collectors(&settings, true, None, Some(1));
        assert!(!plan.contains(&CollectorKind::CollStats));
        assert!(plan.contains(&CollectorKind::IndexStats));
    }

    #[test]
    fn test_router_skips_top_and_replset() {
        let topology = mongos();
        let plan = plan_collectors(&all_enabled(), true, Some(&topology), Some(1));
        assert!(!plan.contains(&CollectorKind::Top));
        assert!(!plan.contains(&CollectorKind::ReplSetStatus));
        assert!(plan.contains(&CollectorKind::DiagnosticData));
        assert!(plan.contains(&CollectorKind::DbStats));
    }

    #[test]
    fn test_gates_follow_kind_predicates() {
        let topology = mongos();
        let over_limit = plan_collectors(&all_enabled(), true, None, Some(500));
        let on_router = plan_collectors(&all_enabled(), true, Some(&topology), Some(1));

        for kind in GATED {
            assert_eq!(over_limit.contains(&kind), !kind.is_per_collection(), "{kind}");
            assert_eq!(on_router.contains(&kind), !kind.needs_data_node(), "{kind}");
        }
    }

    #[test]
    fn test_collect_all_forces_discovery() {
        let builder = RegistryBuilder::new(&CollectorsConfig {
            collect_all: true,
            coll_stats_limit: 100,
            ..Default::default()
        });
        assert!(builder.settings().discovering_mode);

        let plan = builder.plan(true, None, Some(5));
        assert!(plan.contains(&CollectorKind::CollStats));
        assert!(plan.contains(&CollectorKind::DiagnosticData));
        assert!(plan.contains(&CollectorKind::Top));

        let gated = builder.plan(true, None, None);
        assert!(!gated.contains(&CollectorKind::CollStats));
    }

    #[test]
    fn test_build_without_connection() {
        let registry = RegistryBuilder::new(&all_enabled()).build(None, None, Some(1));
        assert_eq!(registry.collector_names(), vec!["general"]);
    }
}
