use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;

use mongodb_exporter::{create_router, Cli, Exporter};
use mongodb_exporter_observability::{init_tracing, LogFormat};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config().await.context("Invalid configuration")?;

    let format: LogFormat = config.logging.format.parse()?;
    init_tracing(format, config.logging.level.as_deref())?;

    tracing::info!(
        uri = %config.mongodb.redacted_uri(),
        pooled = config.mongodb.global_conn_pool,
        "Starting MongoDB exporter {}",
        env!("CARGO_PKG_VERSION")
    );

    let bind_addr = config.web.bind_addr();
    let telemetry_path = config.web.telemetry_path.clone();

    let exporter = Arc::new(Exporter::new(config));
    let _warmup = exporter.spawn_warmup();
    let app = create_router(exporter);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Cannot listen on {bind_addr}"))?;
    tracing::info!("Serving metrics on http://{}{}", bind_addr, telemetry_path);

    axum::serve(listener, app).await?;
    Ok(())
}
