//! Statistics sources, one module per MongoDB command family

mod collstats;
mod dbstats;
mod diagnostic;
mod general;
mod indexstats;
mod replset;
mod top;

pub use collstats::CollStatsCollector;
pub use dbstats::DbStatsCollector;
pub use diagnostic::DiagnosticDataCollector;
pub use general::GeneralCollector;
pub use indexstats::IndexStatsCollector;
pub use replset::ReplSetStatusCollector;
pub use top::TopCollector;
