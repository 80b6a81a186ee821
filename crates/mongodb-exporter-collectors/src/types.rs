//! Common types for collector selection

use std::fmt;

/// Every collector the exporter knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CollectorKind {
    /// `mongodb_up` and build info, always present
    GeneralStatus,
    /// `getDiagnosticData` / `serverStatus`
    DiagnosticData,
    /// `dbStats` per database
    DbStats,
    /// `collStats` per namespace
    CollStats,
    /// `$indexStats` per namespace
    IndexStats,
    /// `top` operation timings
    Top,
    /// `replSetGetStatus`
    ReplSetStatus,
}

impl CollectorKind {
    /// Get string label used in logs and registration
    pub fn as_label(&self) -> &'static str {
        match self {
            CollectorKind::GeneralStatus => "general",
            CollectorKind::DiagnosticData => "diagnostic_data",
            CollectorKind::DbStats => "dbstats",
            CollectorKind::CollStats => "collstats",
            CollectorKind::IndexStats => "indexstats",
            CollectorKind::Top => "top",
            CollectorKind::ReplSetStatus => "replset_status",
        }
    }

    /// True for the collectors subject to the collection-count ceiling
    pub fn is_per_collection(&self) -> bool {
        matches!(self, CollectorKind::CollStats | CollectorKind::IndexStats)
    }

    /// True for collectors that make no sense on a router
    pub fn needs_data_node(&self) -> bool {
        matches!(self, CollectorKind::Top | CollectorKind::ReplSetStatus)
    }
}

impl fmt::Display for CollectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_unique() {
        let kinds = [
            CollectorKind::GeneralStatus,
            CollectorKind::DiagnosticData,
            CollectorKind::DbStats,
            CollectorKind::CollStats,
            CollectorKind::IndexStats,
            CollectorKind::Top,
            CollectorKind::ReplSetStatus,
        ];
        let mut labels: Vec<_> = kinds.iter().map(|k| k.as_label()).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), kinds.len());
    }

    #[test]
    fn test_gating_classes() {
        assert!(CollectorKind::CollStats.is_per_collection());
        assert!(CollectorKind::IndexStats.is_per_collection());
        assert!(!CollectorKind::DbStats.is_per_collection());
        assert!(CollectorKind::Top.needs_data_node());
        assert!(CollectorKind::ReplSetStatus.needs_data_node());
        assert!(!CollectorKind::DiagnosticData.needs_data_node());
        assert_eq!(CollectorKind::Top.to_string(), "top");
    }
}
