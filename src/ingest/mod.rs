// src/ingest/mod.rs
pub mod fetch;
pub mod normalize;
pub mod providers;
pub mod scheduler;
pub mod types;

use crate::ingest::fetch::{FetchEnd, Fetcher};
use crate::ingest::types::{CanonicalRecord, SearchApi};
use crate::stream::{DeliveryOutcome, StreamApi, Writer};

pub use normalize::{clean_text, normalize, normalize_all};

/// How many records the per-cycle preview logs.
const PREVIEW_RECORDS: usize = 20;
const PREVIEW_BODY_CHARS: usize = 200;

/// What one cycle asks for.
#[derive(Debug, Clone)]
pub struct CycleParams {
    pub query: String,
    pub window_hours: u32,
    pub max_pages: Option<u32>,
}

/// Counts for one fetch → normalize → deliver pass.
#[derive(Debug)]
pub struct CycleReport {
    pub fetched: usize,
    pub processed: usize,
    pub rejected: usize,
    pub delivered: usize,
    pub failed: usize,
    pub fetch_end: FetchEnd,
}

impl CycleReport {
    fn early(fetched: usize, rejected: usize, fetch_end: FetchEnd) -> Self {
        Self {
            fetched,
            processed: 0,
            rejected,
            delivered: 0,
            failed: 0,
            fetch_end,
        }
    }
}

/// Fetcher → Normalizer → Writer, owned for the life of the process.
pub struct Pipeline<A, S> {
    fetcher: Fetcher<A>,
    writer: Writer<S>,
    params: CycleParams,
}

impl<A: SearchApi, S: StreamApi> Pipeline<A, S> {
    pub fn new(fetcher: Fetcher<A>, writer: Writer<S>, params: CycleParams) -> Self {
        Self {
            fetcher,
            writer,
            params,
        }
    }

    pub fn writer(&self) -> &Writer<S> {
        &self.writer
    }

    pub fn fetcher(&self) -> &Fetcher<A> {
        &self.fetcher
    }

    /// One ingestion pass. Component failures are absorbed into the report.
    pub async fn run_cycle(&self) -> anyhow::Result<CycleReport> {
        tracing::info!(query = %self.params.query, "starting news ingestion cycle");

        let fetched = self
            .fetcher
            .fetch_all(
                &self.params.query,
                self.params.window_hours,
                self.params.max_pages,
            )
            .await;
        if let FetchEnd::Failed { page, error } = &fetched.end {
            tracing::warn!(page, %error, kept = fetched.articles.len(), "pagination ended early");
        }

        let fetched_count = fetched.articles.len();
        if fetched_count == 0 {
            tracing::warn!("no articles fetched");
            return Ok(CycleReport::early(0, 0, fetched.end));
        }

        let (records, rejected) = normalize_all(fetched.articles);
        if records.is_empty() {
            tracing::warn!(rejected, "no valid articles after processing");
            return Ok(CycleReport::early(fetched_count, rejected, fetched.end));
        }

        log_preview(&records);

        tracing::info!(
            records = records.len(),
            stream = self.writer.stream().stream_name(),
            "writing to stream"
        );
        let DeliveryOutcome { delivered, failed } = self.writer.deliver(&records).await;

        let report = CycleReport {
            fetched: fetched_count,
            processed: records.len(),
            rejected,
            delivered,
            failed,
            fetch_end: fetched.end,
        };
        tracing::info!(
            fetched = report.fetched,
            processed = report.processed,
            rejected = report.rejected,
            delivered = report.delivered,
            failed = report.failed,
            fetch_end = report.fetch_end.label(),
            "ingestion cycle completed"
        );
        Ok(report)
    }
}

fn log_preview(records: &[CanonicalRecord]) {
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return;
    }
    for (i, rec) in records.iter().take(PREVIEW_RECORDS).enumerate() {
        let body = if rec.body.is_empty() {
            "(no content)".to_string()
        } else {
            truncate_chars(&rec.body, PREVIEW_BODY_CHARS)
        };
        tracing::debug!(
            n = i + 1,
            title = %rec.title,
            source = %rec.source_name,
            published = ?rec.published_at,
            url = %rec.url,
            content = %body,
            "article"
        );
    }
    if records.len() > PREVIEW_RECORDS {
        tracing::debug!(more = records.len() - PREVIEW_RECORDS, "more articles not shown");
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
