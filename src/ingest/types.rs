// src/ingest/types.rs
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{FetchError, Rejection};

/// An article exactly as the search API returned it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawArticle(pub Map<String, Value>);

impl RawArticle {
    /// Wrap a JSON value; anything but an object is rejected.
    pub fn from_value(v: Value) -> Result<Self, Rejection> {
        match v {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(Rejection::NotAnObject),
        }
    }

    /// String field lookup. `null` and a missing key both read as `None`.
    pub fn str_field(&self, field: &'static str) -> Result<Option<&str>, Rejection> {
        match self.0.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(Rejection::InvalidField { field }),
        }
    }

    /// `source.name`, the publisher's display name.
    pub fn source_name(&self) -> Result<Option<&str>, Rejection> {
        match self.0.get("source") {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(src)) => match src.get("name") {
                None | Some(Value::Null) => Ok(None),
                Some(Value::String(s)) => Ok(Some(s.as_str())),
                Some(_) => Err(Rejection::InvalidField { field: "source" }),
            },
            Some(_) => Err(Rejection::InvalidField { field: "source" }),
        }
    }
}

impl From<Map<String, Value>> for RawArticle {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Normalized, dedup-ready unit delivered to the stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    #[serde(rename = "article_id")]
    pub id: String,
    pub source_name: String,
    pub title: String,
    #[serde(rename = "content")]
    pub body: String,
    pub url: String,
    pub author: String,
    pub published_at: Option<DateTime<FixedOffset>>,
    pub ingested_at: DateTime<Utc>,
}

/// Parameters for one search page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub query: String,
    pub page_size: u32,
    pub sort_by: String,
    pub language: String,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub page: u32,
}

/// One page of search results.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub articles: Vec<Value>,
    pub total_results: u64,
}

#[async_trait::async_trait]
pub trait SearchApi: Send + Sync {
    async fn fetch_page(&self, req: &PageRequest) -> Result<SearchPage, FetchError>;
    fn name(&self) -> &'static str;
}
