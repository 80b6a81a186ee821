//! Exporter self-metrics, kept in the process default registry.
//!
//! They are served alongside the MongoDB metrics unless the default registry
//! is disabled.

use prometheus::{IntCounter, IntCounterVec, Opts};
use std::sync::OnceLock;
use tracing::warn;

/// Scrapes handled, by outcome
pub static SCRAPES: OnceLock<IntCounterVec> = OnceLock::new();

/// Failed attempts to reach MongoDB
pub static CONNECT_FAILURES: OnceLock<IntCounter> = OnceLock::new();

/// Create and register the self-metrics. Safe to call more than once.
pub fn init() {
    let registry = prometheus::default_registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            if $metric.get().is_none() {
                match $init {
                    Ok(m) => {
                        if let Err(e) = registry.register(Box::new(m.clone())) {
                            warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
                        }
                        let _ = $metric.set(m);
                    }
                    Err(e) => warn!(error = %e, concat!("Failed to create metric ", stringify!($metric))),
                }
            }
        };
    }

    register!(
        SCRAPES,
        IntCounterVec::new(
            Opts::new("mongodb_exporter_scrapes_total", "Scrapes handled by the exporter"),
            &["result"],
        )
    );
    register!(
        CONNECT_FAILURES,
        IntCounter::new(
            "mongodb_exporter_connect_failures_total",
            "Failed attempts to connect to MongoDB"
        )
    );
}

pub fn inc_scrape(result: &str) {
    if let Some(m) = SCRAPES.get() {
        m.with_label_values(&[result]).inc();
    }
}

pub fn inc_connect_failure() {
    if let Some(m) = CONNECT_FAILURES.get() {
        m.inc();
    }
}
