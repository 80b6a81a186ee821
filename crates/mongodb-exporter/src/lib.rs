//! MongoDB exporter server
//!
//! Builds per-scrape collector registries against a MongoDB deployment and
//! serves them in the Prometheus text format.
//!
//! # Example
//!
//! ```no_run
//! use mongodb_exporter::{create_router, Exporter};
//! use mongodb_exporter_config::ExporterConfig;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let exporter = Arc::new(Exporter::new(ExporterConfig::default()));
//! exporter.spawn_warmup();
//!
//! let listener = tokio::net::TcpListener::bind(exporter.config().web.bind_addr()).await?;
//! axum::serve(listener, create_router(exporter)).await?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod connection;
pub mod counter;
pub mod exporter;
pub mod handlers;
pub mod metrics;

pub use cli::Cli;
pub use connection::{ConnectionManager, ScrapeConnection};
pub use counter::CollectionCounter;
pub use exporter::{Exporter, ScrapeError};

use axum::{routing::get, Router};
use std::sync::Arc;

/// Create the axum router with the telemetry and health endpoints
pub fn create_router(exporter: Arc<Exporter>) -> Router {
    let telemetry_path = exporter.config().web.telemetry_path.clone();
    Router::new()
        .route(&telemetry_path, get(handlers::metrics_handler))
        .route("/health", get(handlers::health_handler))
        .with_state(exporter)
}
