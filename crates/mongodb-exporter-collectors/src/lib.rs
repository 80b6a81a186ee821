//! MongoDB exporter collectors
//!
//! Backend access and Prometheus collection for the MongoDB exporter.
//!
//! # Features
//!
//! - **Connection capability**: [`Connection`] / [`Connector`] traits with a
//!   driver-backed implementation
//! - **Topology**: node classification from a single `isMaster`
//! - **Collectors**: general status, diagnostic data, dbStats, collStats,
//!   `$indexStats`, top and replica set status
//! - **Request-scoped registry**: collectors assembled per scrape and
//!   gathered concurrently
//!
//! # Example
//!
//! ```ignore
//! use mongodb_exporter_collectors::{encode_text, RegistryBuilder, TopologyInfo};
//!
//! let builder = RegistryBuilder::new(&config.collectors);
//! let topology = TopologyInfo::resolve(connection.as_ref()).await?;
//! let registry = builder.build(Some(connection), Some(&topology), Some(12));
//! let body = encode_text(&registry.gather().await)?;
//! ```

pub mod builder;
pub mod collector;
pub mod collectors;
pub mod connection;
pub mod error;
pub mod metric_set;
pub mod namespace;
pub mod registry;
pub mod topology;
pub mod types;

pub use builder::{limits_ok, plan_collectors, RegistryBuilder};
pub use collector::{CollectorContext, MetricCollector};
pub use connection::{Connection, Connector, MongoConnection, MongoConnector};
pub use error::{CollectorError, ConnectionError};
pub use metric_set::MetricSet;
pub use namespace::{count_user_collections, Namespace};
pub use registry::{encode_text, RequestRegistry};
pub use topology::{NodeType, TopologyInfo};
pub use types::CollectorKind;

// Re-export prometheus and bson types for convenience
pub use mongodb::bson;
pub use prometheus::proto::MetricFamily;
