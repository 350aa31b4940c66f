// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

const DEFAULT_FILTER: &str = "ledgerpost_node=debug,tower_http=debug";

/// Install the fmt subscriber, filtered by `RUST_LOG`.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Initialize telemetry (logs + metrics)
pub fn init_telemetry() {
    init_logging();

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if PROM_HANDLE.set(handle).is_err() {
                tracing::warn!("Prometheus handle already set. Telemetry re-initialized?");
            }
        }
        Err(e) => {
            tracing::warn!("Metrics disabled, recorder not installed: {}", e);
            return;
        }
    }

    metrics::describe_counter!("ledgerpost_entries_appended_total", "Entries accepted by the log service");
    metrics::describe_counter!("ledgerpost_pipeline_results_total", "Terminal pipeline results by outcome");
    metrics::describe_histogram!("ledgerpost_pipeline_duration_seconds", "Time from send to terminal result");
    metrics::describe_counter!("ledgerpost_messages_delivered_total", "Messages accepted by the delivery service");

    metrics::gauge!("ledgerpost_node_up", 1.0);
}

/// Get the Prometheus handle to render metrics
pub fn get_metrics() -> String {
    if let Some(handle) = PROM_HANDLE.get() {
        handle.render()
    } else {
        "# metrics not initialized".to_string()
    }
}
