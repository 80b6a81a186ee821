//! Logging setup for the MongoDB exporter.
//!
//! Wraps `tracing-subscriber` so the binary can pick an output format and a
//! filter from configuration, falling back to `RUST_LOG`.
//!
//! # Example
//!
//! ```ignore
//! use mongodb_exporter_observability::{init_tracing, LogFormat};
//!
//! init_tracing(LogFormat::Compact, Some("info"))?;
//! tracing::info!("exporter starting");
//! ```

pub mod config;
pub mod initialization;

pub use config::{LogConfig, LogError, LogFormat, LogOutput};
pub use initialization::{init_tracing, init_tracing_with_config};
