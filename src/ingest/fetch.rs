// src/ingest/fetch.rs
//! Paginated retrieval across one fixed time window.

use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use metrics::counter;
use serde_json::Value;

use crate::error::FetchError;
use crate::ingest::types::{PageRequest, SearchApi};

/// The search API refuses larger pages.
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone)]
pub struct SearchParams {
    pub page_size: u32,
    pub sort_by: String,
    pub language: String,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            page_size: MAX_PAGE_SIZE,
            sort_by: "publishedAt".to_string(),
            language: "en".to_string(),
        }
    }
}

impl SearchParams {
    pub fn effective_page_size(&self) -> u32 {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeWindow {
    /// `[now - hours, now]`
    pub fn ending_at(now: DateTime<Utc>, hours: u32) -> Self {
        Self {
            from: now - ChronoDuration::hours(i64::from(hours)),
            to: now,
        }
    }
}

/// Why pagination stopped.
#[derive(Debug)]
pub enum FetchEnd {
    /// A page came back with no articles.
    EmptyPage,
    /// The page count derived from `totalResults` was reached.
    LastPage,
    /// The caller's `max_pages` was reached.
    PageLimit,
    /// A page request failed; everything before it is kept.
    Failed { page: u32, error: FetchError },
}

impl FetchEnd {
    pub fn is_failure(&self) -> bool {
        matches!(self, FetchEnd::Failed { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            FetchEnd::EmptyPage => "empty_page",
            FetchEnd::LastPage => "last_page",
            FetchEnd::PageLimit => "page_limit",
            FetchEnd::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug)]
pub struct FetchOutcome {
    pub articles: Vec<Value>,
    /// Pages that returned articles.
    pub pages: u32,
    pub end: FetchEnd,
}

pub struct Fetcher<A> {
    api: A,
    params: SearchParams,
    page_delay: Duration,
}

impl<A: SearchApi> Fetcher<A> {
    pub fn new(api: A, params: SearchParams) -> Self {
        Self {
            api,
            params,
            page_delay: Duration::from_secs(1),
        }
    }

    /// Pause between successful pages (rate-limit courtesy).
    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Fetch everything published in the last `window_hours`, counted from now.
    pub async fn fetch_all(
        &self,
        query: &str,
        window_hours: u32,
        max_pages: Option<u32>,
    ) -> FetchOutcome {
        let window = TimeWindow::ending_at(Utc::now(), window_hours);
        self.fetch_window(query, window, max_pages).await
    }

    /// Page through `window`. A failed page ends pagination and is reported in
    /// [`FetchOutcome::end`]; it is never returned as an error.
    pub async fn fetch_window(
        &self,
        query: &str,
        window: TimeWindow,
        max_pages: Option<u32>,
    ) -> FetchOutcome {
        let page_size = self.params.effective_page_size();
        let max_pages = max_pages.filter(|m| *m > 0);
        let mut articles = Vec::new();
        let mut pages = 0u32;
        let mut page = 1u32;

        let end = loop {
            let req = PageRequest {
                query: query.to_string(),
                page_size,
                sort_by: self.params.sort_by.clone(),
                language: self.params.language.clone(),
                from: window.from,
                to: window.to,
                page,
            };

            let resp = match self.api.fetch_page(&req).await {
                Ok(resp) => resp,
                Err(error) => {
                    tracing::error!(
                        %error,
                        page,
                        provider = self.api.name(),
                        "error fetching page"
                    );
                    counter!("ingest_fetch_errors_total").increment(1);
                    break FetchEnd::Failed { page, error };
                }
            };
            counter!("ingest_pages_total").increment(1);

            if resp.articles.is_empty() {
                break FetchEnd::EmptyPage;
            }

            tracing::info!(
                fetched = resp.articles.len(),
                page,
                total = resp.total_results,
                "fetched page"
            );
            articles.extend(resp.articles);
            pages += 1;

            let total_pages = resp.total_results.div_ceil(u64::from(page_size));
            if u64::from(page) >= total_pages {
                break FetchEnd::LastPage;
            }
            if max_pages.is_some_and(|m| page >= m) {
                break FetchEnd::PageLimit;
            }

            page += 1;
            tokio::time::sleep(self.page_delay).await;
        };

        counter!("ingest_articles_fetched_total").increment(articles.len() as u64);
        tracing::info!(
            total = articles.len(),
            pages,
            end = end.label(),
            "fetch finished"
        );
        FetchOutcome {
            articles,
            pages,
            end,
        }
    }
}
