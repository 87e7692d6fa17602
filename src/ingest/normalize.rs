// src/ingest/normalize.rs
//! Raw article → [`CanonicalRecord`]. Pure apart from reading the clock for `ingested_at`.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use metrics::counter;
use once_cell::sync::OnceCell;
use regex::Regex;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::Rejection;
use crate::ingest::types::{CanonicalRecord, RawArticle};

/// Placeholder the search API puts in `content` when the publisher withholds it.
pub const REMOVED_CONTENT: &str = "[Removed]";
pub const UNKNOWN: &str = "Unknown";

/// Collapse whitespace runs to one space and trim.
pub fn clean_text(s: &str) -> String {
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex"));
    re_ws.replace_all(s, " ").trim().to_string()
}

/// Stable article id: SHA-256 over `"{url}:{title}"`, lowercase hex.
pub fn article_id(url: &str, title: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hasher.update(b":");
    hasher.update(title.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for b in digest.iter() {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Permissive timestamp parse. Accepts RFC 3339 (`Z` included), offset-less
/// date-times (taken as UTC) and bare dates (midnight UTC).
pub fn parse_published(ts: &str) -> Option<DateTime<FixedOffset>> {
    let ts = ts.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
        return Some(dt);
    }
    let utc = FixedOffset::east_opt(0)?;
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(ts, fmt) {
            return Some(naive.and_utc().with_timezone(&utc));
        }
    }
    NaiveDate::parse_from_str(ts, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().with_timezone(&utc))
}

/// Prefer `content`, fall back to `description` when content is absent, empty or withheld.
fn extract_body(raw: &RawArticle) -> Result<String, Rejection> {
    let content = raw.str_field("content")?;
    let picked = match content {
        Some(c) if !c.is_empty() && c != REMOVED_CONTENT => Some(c),
        _ => raw.str_field("description")?,
    };
    Ok(picked.map(clean_text).unwrap_or_default())
}

fn clean_or_unknown(s: Option<&str>) -> String {
    let cleaned = s.map(clean_text).unwrap_or_default();
    if cleaned.is_empty() {
        UNKNOWN.to_string()
    } else {
        cleaned
    }
}

/// Normalize one raw article, stamping `ingested_at` with `now`.
pub fn normalize_at(raw: Value, now: DateTime<Utc>) -> Result<CanonicalRecord, Rejection> {
    let raw = RawArticle::from_value(raw)?;

    let url = raw
        .str_field("url")?
        .filter(|u| !u.trim().is_empty())
        .ok_or(Rejection::MissingUrl)?;
    let title = raw
        .str_field("title")?
        .filter(|t| !t.is_empty())
        .ok_or(Rejection::MissingTitle)?;

    let published_at = match raw.str_field("publishedAt")? {
        Some(ts) if !ts.is_empty() => {
            let parsed = parse_published(ts);
            if parsed.is_none() {
                tracing::warn!(published_at = ts, url, "unparseable publishedAt, dropping it");
            }
            parsed
        }
        _ => None,
    };

    let record = CanonicalRecord {
        id: article_id(url, title),
        source_name: clean_or_unknown(raw.source_name()?),
        title: clean_text(title),
        body: extract_body(&raw)?,
        url: url.to_string(),
        author: clean_or_unknown(raw.str_field("author")?),
        published_at,
        ingested_at: now,
    };

    if record.id.is_empty() {
        return Err(Rejection::EmptyAfterCleaning { field: "id" });
    }
    if record.title.is_empty() {
        return Err(Rejection::EmptyAfterCleaning { field: "title" });
    }
    Ok(record)
}

pub fn normalize(raw: Value) -> Result<CanonicalRecord, Rejection> {
    normalize_at(raw, Utc::now())
}

/// Normalize a batch. Rejections are logged and counted; they never stop the batch.
/// Returns (accepted, rejected_count).
pub fn normalize_all(raws: Vec<Value>) -> (Vec<CanonicalRecord>, usize) {
    let total = raws.len();
    let mut kept = Vec::with_capacity(total);
    let mut rejected = 0usize;
    for raw in raws {
        match normalize(raw) {
            Ok(rec) => kept.push(rec),
            Err(reason) => {
                tracing::warn!(%reason, "skipping article");
                rejected += 1;
            }
        }
    }
    counter!("ingest_rejected_total").increment(rejected as u64);
    tracing::info!(processed = kept.len(), total, "normalized articles");
    (kept, rejected)
}
