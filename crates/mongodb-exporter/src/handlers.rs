//! HTTP handlers

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use mongodb_exporter_collectors::encode_text;
use std::sync::Arc;
use tracing::{debug, error};

use crate::exporter::Exporter;

/// Prefix of the body served when the topology query fails
pub const TOPOLOGY_ERROR_PREFIX: &str = "An error has occurred while getting topology info:\n\n";

/// Handler for the telemetry path
///
/// Always 200 with whatever could be collected, except when the node cannot
/// be classified: then 500 with the error text.
pub async fn metrics_handler(State(exporter): State<Arc<Exporter>>) -> Response {
    let families = match exporter.scrape().await {
        Ok(families) => families,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("{TOPOLOGY_ERROR_PREFIX}{e}"),
            )
                .into_response();
        }
    };

    match encode_text(&families) {
        Ok(body) => {
            debug!(families = families.len(), "Serving metrics");
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
                body,
            )
                .into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {e}"),
            )
                .into_response()
        }
    }
}

/// Handler for `/health`
pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
