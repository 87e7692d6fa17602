//! News ingest service binary entrypoint.
//! Validates settings, checks the stream, then runs the ingest cycle on a fixed interval.

use std::process::ExitCode;

use news_stream_ingest::ingest::providers::newsapi::NewsApiClient;
use news_stream_ingest::stream::kinesis::KinesisStream;
use news_stream_ingest::{telemetry, Fetcher, Pipeline, Scheduler, Settings, Writer};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when the file is absent.
    let _ = dotenvy::dotenv();

    let settings = match Settings::from_env() {
        Ok(s) => s,
        Err(e) => {
            // Telemetry is not up yet.
            eprintln!("configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = telemetry::init_tracing(&settings.log_level, settings.log_format) {
        eprintln!("{e:#}");
        return ExitCode::FAILURE;
    }
    if let Some(addr) = settings.metrics_addr {
        if let Err(e) = telemetry::install_prometheus(addr) {
            warn!(error = ?e, "metrics exporter disabled");
        }
    }
    info!(?settings, "configuration validated");

    // Ctrl-C during startup ends in a clean stop too.
    let mut scheduler =
        Scheduler::new(settings.poll_interval()).with_max_iterations(settings.max_iterations);
    let stop = scheduler.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received interrupt signal, shutting down");
            stop.stop();
        }
    });

    let api = match NewsApiClient::new(
        &settings.newsapi_key,
        settings.newsapi_base_url.clone(),
        settings.request_timeout(),
    ) {
        Ok(api) => api,
        Err(e) => {
            error!(error = ?e, "failed to build search api client");
            return ExitCode::FAILURE;
        }
    };
    let fetcher =
        Fetcher::new(api, settings.search_params()).with_page_delay(settings.page_delay());

    let stream = KinesisStream::connect(
        &settings.aws_region,
        settings.aws_endpoint_url.as_deref(),
        &settings.stream_name,
    )
    .await;
    let writer = Writer::new(stream, settings.batch_size);

    if scheduler.stop_handle().is_stopped() {
        info!("interrupted during startup");
        return ExitCode::SUCCESS;
    }

    info!(stream = %settings.stream_name, "testing stream connection");
    if !writer.test_connection().await {
        error!(stream = %settings.stream_name, "failed to connect to stream, exiting");
        return ExitCode::FAILURE;
    }

    let pipeline = Pipeline::new(fetcher, writer, settings.cycle_params());

    info!(
        poll_interval_secs = settings.poll_interval_secs,
        query = %settings.query,
        hours_back = settings.hours_back,
        stream = %settings.stream_name,
        "starting news ingestion pipeline"
    );
    let pipeline = &pipeline;
    scheduler.run(move || pipeline.run_cycle()).await;

    ExitCode::SUCCESS
}
