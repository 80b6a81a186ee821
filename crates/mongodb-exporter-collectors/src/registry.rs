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
//! Request-scoped collector registry

use futures::future::join_all;
use prometheus::proto::MetricFamily;
use prometheus::{Encoder, Registry, TextEncoder};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

use crate::collector::MetricCollector;
use crate::error::CollectorError;
use crate::types::CollectorKind;

/// Collectors assembled for a single scrape.
///
/// Holds no state between requests; build one, gather it, drop it.
#[derive(Default)]
pub struct RequestRegistry {
    collectors: Vec<Box<dyn MetricCollector>>,
}

impl RequestRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a collector. A second collector with the same name is refused.
    pub fn register(&mut self, collector: Box<dyn MetricCollector>) -> Result<(), CollectorError> {
        let name = collector.name();
        if self.collectors.iter().any(|c| c.name() == name) {
            return Err(CollectorError::AlreadyRegistered(name));
        }
        self.collectors.push(collector);
        Ok(())
    }

    /// Registered collector names, in registration order
    pub fn collector_names(&self) -> Vec<&'static str> {
        self.collectors.iter().map(|c| c.name()).collect()
    }

    pub fn contains(&self, kind: CollectorKind) -> bool {
        self.collectors.iter().any(|c| c.kind() == kind)
    }

    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }

    /// Run every collector concurrently and merge the results.
    ///
    /// A failing collector is logged and left out; the others still report.
    /// Families come back sorted by name.
    pub async fn gather(&self) -> Vec<MetricFamily> {
        self.gather_until(None).await
    }

    /// Like [`gather`](Self::gather), but collectors still running at
    /// `deadline` are abandoned and only finished ones are reported.
    ///
    /// The general-status collector is never cut off; it bounds its own
    /// ping and reports down instead.
    pub async fn gather_until(&self, deadline: Option<Instant>) -> Vec<MetricFamily> {
        let results = join_all(self.collectors.iter().map(|collector| async move {
            let result = match deadline {
                Some(deadline) if collector.kind() != CollectorKind::GeneralStatus => {
                    timeout_at(deadline, collector.collect())
                        .await
                        .unwrap_or(Err(CollectorError::DeadlineExceeded))
                }
                _ => collector.collect().await,
            };
            (collector.name(), result)
        }))
        .await;

        let registry = Registry::new();
        for (name, result) in results {
            match result {
                Ok(set) if set.is_empty() => debug!(collector = name, "Collector produced no metrics"),
                Ok(set) => {
                    let metrics = set.len();
                    match registry.register(Box::new(set)) {
                        Ok(()) => debug!(collector = name, metrics, "Collector gathered"),
                        Err(e) => warn!(collector = name, error = %e, "Failed to register collector output"),
                    }
                }
                Err(e) => warn!(collector = name, error = %e, "Collector failed"),
            }
        }
        registry.gather()
    }
}

/// Encode families in the Prometheus text exposition format
pub fn encode_text(families: &[MetricFamily]) -> Result<String, CollectorError> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| CollectorError::Metric(prometheus::Error::Msg(e.to_string())))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::metric_set::MetricSet;
    use async_trait::async_trait;

    struct Fixed {
        kind: CollectorKind,
        metric: &'static str,
        fail: bool,
    }

    #[async_trait]
    impl MetricCollector for Fixed {
        fn kind(&self) -> CollectorKind {
            self.kind
        }

        async fn collect(&self) -> Result<MetricSet, CollectorError> {
            if self.fail {
                return Err(CollectorError::unexpected("test", "scripted failure"));
            }
            let mut set = MetricSet::default();
            set.gauge(self.metric, "fixed", &[], 1.0)?;
            Ok(set)
        }
    }

    fn fixed(kind: CollectorKind, metric: &'static str) -> Box<dyn MetricCollector> {
        Box::new(Fixed {
            kind,
            metric,
            fail: false,
        })
    }

    #[test]
    fn test_duplicate_registration_is_refused() {
        let mut registry = RequestRegistry::new();
        registry.register(fixed(CollectorKind::Top, "mongodb_a")).unwrap();
        let err = registry
            .register(fixed(CollectorKind::Top, "mongodb_b"))
            .unwrap_err();
        assert!(matches!(err, CollectorError::AlreadyRegistered("top")));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_gather_isolates_failures() {
        let mut registry = RequestRegistry::new();
        registry
            .register(fixed(CollectorKind::GeneralStatus, "mongodb_up"))
            .unwrap();
        registry
            .register(Box::new(Fixed {
                kind: CollectorKind::DbStats,
                metric: "mongodb_dbstats_ok",
                fail: true,
            }))
            .unwrap();
        registry
            .register(fixed(CollectorKind::Top, "mongodb_top_total_time"))
            .unwrap();

        let text = encode_text(&registry.gather().await).unwrap();
        assert!(text.contains("mongodb_up 1"));
        assert!(text.contains("mongodb_top_total_time 1"));
        assert!(!text.contains("mongodb_dbstats_ok"));
    }

    #[tokio::test]
    async fn test_conflicting_outputs_keep_first() {
        let mut registry = RequestRegistry::new();
        registry
            .register(fixed(CollectorKind::DiagnosticData, "mongodb_same"))
            .unwrap();
        registry
            .register(fixed(CollectorKind::DbStats, "mongodb_same"))
            .unwrap();

        let families = registry.gather().await;
        assert_eq!(families.len(), 1);
    }

    struct Stalled(CollectorKind);

    #[async_trait]
    impl MetricCollector for Stalled {
        fn kind(&self) -> CollectorKind {
            self.0
        }

        async fn collect(&self) -> Result<MetricSet, CollectorError> {
            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
            let mut set = MetricSet::default();
            set.gauge("mongodb_stalled", "never served", &[], 1.0)?;
            Ok(set)
        }
    }

    #[tokio::test]
    async fn test_gather_until_serves_finished_collectors() {
        let mut registry = RequestRegistry::new();
        registry
            .register(fixed(CollectorKind::GeneralStatus, "mongodb_up"))
            .unwrap();
        registry.register(Box::new(Stalled(CollectorKind::Top))).unwrap();

        let started = std::time::Instant::now();
        let deadline = Instant::now() + std::time::Duration::from_millis(50);
        let text = encode_text(&registry.gather_until(Some(deadline)).await).unwrap();

        assert!(started.elapsed() < std::time::Duration::from_secs(2));
        assert!(text.contains("mongodb_up 1"));
        assert!(!text.contains("mongodb_stalled"));
    }

    #[test]
    fn test_empty_registry_gathers_nothing() {
        let registry = RequestRegistry::new();
        assert!(registry.is_empty());
        assert!(tokio_test::block_on(registry.gather()).is_empty());
    }
}
