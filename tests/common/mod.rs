// tests/common/mod.rs
// In-memory search API and stream used across the integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use news_stream_ingest::error::{FetchError, StreamError};
use news_stream_ingest::ingest::normalize::normalize_at;
use news_stream_ingest::ingest::types::{CanonicalRecord, PageRequest, SearchApi, SearchPage};
use news_stream_ingest::stream::{BatchPutResult, StreamApi, StreamEntry, StreamStatus};
use serde_json::{json, Value};

pub fn article(n: usize) -> Value {
    json!({
        "source": {"id": null, "name": "Example  News"},
        "author": "Jane   Doe",
        "title": format!("Headline {n}"),
        "description": "Short description",
        "url": format!("https://news.example/{n}"),
        "publishedAt": "2024-01-01T00:00:00Z",
        "content": format!("Body of article {n}"),
    })
}

pub fn articles(range: std::ops::Range<usize>) -> Vec<Value> {
    range.map(article).collect()
}

pub fn record(n: usize) -> CanonicalRecord {
    let now = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    normalize_at(article(n), now).expect("fixture article normalizes")
}

pub fn records(count: usize) -> Vec<CanonicalRecord> {
    (0..count).map(record).collect()
}

pub fn page(articles: Vec<Value>, total_results: u64) -> Result<SearchPage, FetchError> {
    Ok(SearchPage {
        articles,
        total_results,
    })
}

/// Replays scripted pages in order; an exhausted script yields empty pages.
#[derive(Default)]
pub struct ScriptedSearch {
    script: Mutex<VecDeque<Result<SearchPage, FetchError>>>,
    pub requests: Mutex<Vec<PageRequest>>,
}

impl ScriptedSearch {
    pub fn new(pages: Vec<Result<SearchPage, FetchError>>) -> Self {
        Self {
            script: Mutex::new(pages.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn pages_requested(&self) -> Vec<u32> {
        self.requests.lock().unwrap().iter().map(|r| r.page).collect()
    }
}

#[async_trait]
impl SearchApi for ScriptedSearch {
    async fn fetch_page(&self, req: &PageRequest) -> Result<SearchPage, FetchError> {
        self.requests.lock().unwrap().push(req.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(SearchPage::default()))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

pub enum BatchReply {
    /// Service answers, reporting this many failed records.
    Failed(usize),
    /// Request never succeeds.
    Error,
}

pub enum DescribeReply {
    Status(StreamStatus),
    NotFound,
    Error,
}

pub struct MemoryStream {
    pub batches: Mutex<Vec<Vec<StreamEntry>>>,
    pub singles: Mutex<Vec<StreamEntry>>,
    batch_replies: Mutex<VecDeque<BatchReply>>,
    single_replies: Mutex<VecDeque<bool>>,
    describe: DescribeReply,
}

impl Default for MemoryStream {
    fn default() -> Self {
        Self {
            batches: Mutex::new(Vec::new()),
            singles: Mutex::new(Vec::new()),
            batch_replies: Mutex::new(VecDeque::new()),
            single_replies: Mutex::new(VecDeque::new()),
            describe: DescribeReply::Status(StreamStatus::Active),
        }
    }
}

impl MemoryStream {
    pub fn with_batch_replies(replies: Vec<BatchReply>) -> Self {
        Self {
            batch_replies: Mutex::new(replies.into()),
            ..Self::default()
        }
    }

    /// `true` = accepted, `false` = service error.
    pub fn with_single_replies(replies: Vec<bool>) -> Self {
        Self {
            single_replies: Mutex::new(replies.into()),
            ..Self::default()
        }
    }

    pub fn with_describe(describe: DescribeReply) -> Self {
        Self {
            describe,
            ..Self::default()
        }
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().unwrap().iter().map(Vec::len).collect()
    }
}

#[async_trait]
impl StreamApi for MemoryStream {
    async fn put_record(&self, entry: StreamEntry) -> Result<(), StreamError> {
        self.singles.lock().unwrap().push(entry);
        match self.single_replies.lock().unwrap().pop_front() {
            Some(false) => Err(StreamError::Service {
                code: "ProvisionedThroughputExceededException".into(),
                message: "slow down".into(),
            }),
            _ => Ok(()),
        }
    }

    async fn put_records(&self, entries: Vec<StreamEntry>) -> Result<BatchPutResult, StreamError> {
        let n = entries.len();
        self.batches.lock().unwrap().push(entries);
        match self.batch_replies.lock().unwrap().pop_front() {
            Some(BatchReply::Failed(k)) => Ok(BatchPutResult {
                records: n,
                failed: k,
            }),
            Some(BatchReply::Error) => Err(StreamError::Transport("connection reset".into())),
            None => Ok(BatchPutResult {
                records: n,
                failed: 0,
            }),
        }
    }

    async fn describe(&self) -> Result<StreamStatus, StreamError> {
        match &self.describe {
            DescribeReply::Status(s) => Ok(s.clone()),
            DescribeReply::NotFound => Err(StreamError::NotFound("news".into())),
            DescribeReply::Error => Err(StreamError::Transport("dns failure".into())),
        }
    }

    fn stream_name(&self) -> &str {
        "news"
    }
}
