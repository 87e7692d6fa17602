// src/telemetry.rs
use std::net::SocketAddr;

use anyhow::{anyhow, Context, Result};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LogFormat;

/// Install the global subscriber. `RUST_LOG` wins over `level`.
pub fn init_tracing(level: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.to_ascii_lowercase()))
        .context("invalid LOG_LEVEL")?;

    let registry = tracing_subscriber::registry().with(filter);
    let timer = fmt::time::UtcTime::rfc_3339();
    match format {
        LogFormat::Text => registry
            .with(fmt::layer().compact().with_target(true).with_timer(timer))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_target(true).with_timer(timer))
            .try_init(),
    }
    .map_err(|e| anyhow!("installing tracing subscriber: {e}"))
}

/// Register help text for every series. Descriptions land in whichever recorder
/// is installed at call time, so call this after the exporter is up.
pub fn describe_metrics() {
    describe_counter!("ingest_pages_total", "Search API pages fetched.");
    describe_counter!("ingest_fetch_errors_total", "Search API page failures.");
    describe_counter!(
        "ingest_articles_fetched_total",
        "Raw articles returned by the search API."
    );
    describe_counter!("ingest_rejected_total", "Articles rejected by normalization.");
    describe_counter!("ingest_delivered_total", "Records accepted by the stream.");
    describe_counter!(
        "ingest_delivery_failed_total",
        "Records the stream rejected or never received."
    );
    describe_counter!("ingest_cycles_total", "Ingest cycles run.");
    describe_counter!(
        "ingest_cycle_failures_total",
        "Ingest cycles that ended in an error or panic."
    );
    describe_gauge!(
        "ingest_pipeline_last_run_ts",
        "Unix ts when ingest pipeline last ran."
    );
}

/// Serve Prometheus metrics on `addr`. Must run inside the tokio runtime.
pub fn install_prometheus(addr: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("prometheus: install exporter")?;
    describe_metrics();
    tracing::info!(%addr, "prometheus exporter listening");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptions_reach_the_exporter() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        metrics::with_local_recorder(&recorder, || {
            describe_metrics();
            metrics::counter!("ingest_cycles_total").increment(1);
            metrics::gauge!("ingest_pipeline_last_run_ts").set(1.0);
        });
        let rendered = handle.render();
        assert!(
            rendered.contains("# HELP ingest_cycles_total Ingest cycles run."),
            "{rendered}"
        );
        assert!(rendered.contains("# HELP ingest_pipeline_last_run_ts"), "{rendered}");
    }
}
