// src/ingest/providers/newsapi.rs
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::Value;

use crate::error::FetchError;
use crate::ingest::types::{PageRequest, SearchApi, SearchPage};

pub const DEFAULT_BASE_URL: &str = "https://newsapi.org/v2/everything";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    status: Option<String>,
    code: Option<String>,
    message: Option<String>,
    #[serde(default)]
    total_results: u64,
    #[serde(default)]
    articles: Vec<Value>,
}

/// `/v2/everything` client. One connection pool, reused for every cycle.
pub struct NewsApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl NewsApiClient {
    pub fn new(api_key: &str, base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(api_key).context("api key is not a valid header")?;
        key.set_sensitive(true);
        headers.insert("X-Api-Key", key);

        let http = reqwest::Client::builder()
            .user_agent(concat!("news-stream-ingest/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(10).min(timeout))
            .timeout(timeout)
            .build()
            .context("building search api http client")?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    fn query_params(req: &PageRequest) -> Vec<(&'static str, String)> {
        vec![
            ("q", req.query.clone()),
            ("pageSize", req.page_size.to_string()),
            ("sortBy", req.sort_by.clone()),
            ("language", req.language.clone()),
            ("from", req.from.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ("to", req.to.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ("page", req.page.to_string()),
        ]
    }
}

#[async_trait]
impl SearchApi for NewsApiClient {
    async fn fetch_page(&self, req: &PageRequest) -> Result<SearchPage, FetchError> {
        let resp = self
            .http
            .get(&self.base_url)
            .query(&Self::query_params(req))
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        let parsed: Result<ApiResponse, _> = serde_json::from_str(&body);

        if !status.is_success() {
            let message = parsed
                .ok()
                .and_then(|r| r.message)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("").to_string());
            return Err(FetchError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let data = parsed.map_err(|e| FetchError::Decode(e.to_string()))?;
        if data.status.as_deref() == Some("error") {
            return Err(FetchError::Api {
                code: data.code.unwrap_or_else(|| "unknown".to_string()),
                message: data.message.unwrap_or_else(|| "Unknown error".to_string()),
            });
        }

        Ok(SearchPage {
            articles: data.articles,
            total_results: data.total_results,
        })
    }

    fn name(&self) -> &'static str {
        "newsapi"
    }
}
