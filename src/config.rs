// src/config.rs
//! Process settings: defaults → optional TOML file → environment.
//!
//! Built once in `main` and handed to each component; nothing reads the
//! environment after startup.

use std::fmt;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::ingest::fetch::SearchParams;
use crate::ingest::providers::newsapi::DEFAULT_BASE_URL;
use crate::ingest::CycleParams;

/// Path of an optional TOML file with the same keys as [`Settings`].
pub const ENV_CONFIG_PATH: &str = "NEWS_INGEST_CONFIG";

pub const ENV_NEWSAPI_KEY: &str = "NEWSAPI_KEY";
pub const ENV_STREAM_NAME: &str = "KINESIS_STREAM_NAME";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" | "compact" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("expected `text` or `json`, got `{other}`")),
        }
    }
}

#[derive(Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub newsapi_key: String,
    pub newsapi_base_url: String,
    pub query: String,
    pub page_size: u32,
    pub sort_by: String,
    pub language: String,
    pub hours_back: u32,
    /// `None` (or 0) fetches every page the API reports.
    pub max_pages: Option<u32>,
    pub request_timeout_secs: u64,
    pub page_delay_ms: u64,
    pub aws_region: String,
    pub aws_endpoint_url: Option<String>,
    pub stream_name: String,
    pub batch_size: usize,
    pub poll_interval_secs: u64,
    pub max_iterations: Option<u64>,
    pub log_level: String,
    pub log_format: LogFormat,
    pub metrics_addr: Option<SocketAddr>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            newsapi_key: String::new(),
            newsapi_base_url: DEFAULT_BASE_URL.to_string(),
            query: "technology".to_string(),
            page_size: 100,
            sort_by: "publishedAt".to_string(),
            language: "en".to_string(),
            hours_back: 24,
            max_pages: None,
            request_timeout_secs: 30,
            page_delay_ms: 1_000,
            aws_region: "us-east-1".to_string(),
            aws_endpoint_url: None,
            stream_name: "news-ingest-stream".to_string(),
            batch_size: 500,
            poll_interval_secs: 300,
            max_iterations: None,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            metrics_addr: None,
        }
    }
}

// Never print the API key.
impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("newsapi_key", &format_args!("<{} chars>", self.newsapi_key.len()))
            .field("newsapi_base_url", &self.newsapi_base_url)
            .field("query", &self.query)
            .field("page_size", &self.page_size)
            .field("sort_by", &self.sort_by)
            .field("language", &self.language)
            .field("hours_back", &self.hours_back)
            .field("max_pages", &self.max_pages)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("page_delay_ms", &self.page_delay_ms)
            .field("aws_region", &self.aws_region)
            .field("aws_endpoint_url", &self.aws_endpoint_url)
            .field("stream_name", &self.stream_name)
            .field("batch_size", &self.batch_size)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("max_iterations", &self.max_iterations)
            .field("log_level", &self.log_level)
            .field("log_format", &self.log_format)
            .field("metrics_addr", &self.metrics_addr)
            .finish()
    }
}

impl Settings {
    /// Load `.env`-populated process environment (call `dotenvy::dotenv()` first).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Same as [`Settings::from_env`] over an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |k: &str| lookup(k).filter(|v| !v.trim().is_empty());
        let mut s = match lookup(ENV_CONFIG_PATH) {
            Some(path) => Self::from_toml_file(Path::new(path.trim()))?,
            None => Self::default(),
        };
        s.apply_env(&lookup)?;
        s.validate()?;
        Ok(s)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let file_err = |reason: String| ConfigError::File {
            path: path.display().to_string(),
            reason,
        };
        let content = fs::read_to_string(path).map_err(|e| file_err(e.to_string()))?;
        toml::from_str(&content).map_err(|e| file_err(e.to_string()))
    }

    fn apply_env<F>(&mut self, lookup: &F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        set_string(lookup, ENV_NEWSAPI_KEY, &mut self.newsapi_key);
        set_string(lookup, "NEWSAPI_BASE_URL", &mut self.newsapi_base_url);
        set_string(lookup, "NEWSAPI_QUERY", &mut self.query);
        set_parsed(lookup, "NEWSAPI_PAGE_SIZE", &mut self.page_size)?;
        set_string(lookup, "NEWSAPI_SORT_BY", &mut self.sort_by);
        set_string(lookup, "NEWSAPI_LANGUAGE", &mut self.language);
        set_parsed(lookup, "NEWSAPI_HOURS_BACK", &mut self.hours_back)?;
        set_optional(lookup, "NEWSAPI_MAX_PAGES", &mut self.max_pages)?;
        set_parsed(lookup, "NEWSAPI_TIMEOUT_SECS", &mut self.request_timeout_secs)?;
        set_parsed(lookup, "NEWSAPI_PAGE_DELAY_MS", &mut self.page_delay_ms)?;
        set_string(lookup, "AWS_REGION", &mut self.aws_region);
        set_optional(lookup, "AWS_ENDPOINT_URL", &mut self.aws_endpoint_url)?;
        set_string(lookup, ENV_STREAM_NAME, &mut self.stream_name);
        set_parsed(lookup, "KINESIS_BATCH_SIZE", &mut self.batch_size)?;
        set_parsed(lookup, "POLL_INTERVAL_SECONDS", &mut self.poll_interval_secs)?;
        set_optional(lookup, "MAX_ITERATIONS", &mut self.max_iterations)?;
        set_string(lookup, "LOG_LEVEL", &mut self.log_level);
        set_parsed(lookup, "LOG_FORMAT", &mut self.log_format)?;
        set_optional(lookup, "METRICS_ADDR", &mut self.metrics_addr)?;
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.newsapi_key.trim().is_empty() {
            return Err(ConfigError::Missing(ENV_NEWSAPI_KEY));
        }
        if self.stream_name.trim().is_empty() {
            return Err(ConfigError::Missing(ENV_STREAM_NAME));
        }
        if self.query.trim().is_empty() {
            return Err(invalid("NEWSAPI_QUERY", &self.query, "must not be empty"));
        }
        if self.poll_interval_secs == 0 {
            return Err(invalid("POLL_INTERVAL_SECONDS", "0", "must be at least 1"));
        }
        if self.request_timeout_secs == 0 {
            return Err(invalid("NEWSAPI_TIMEOUT_SECS", "0", "must be at least 1"));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn search_params(&self) -> SearchParams {
        SearchParams {
            page_size: self.page_size,
            sort_by: self.sort_by.clone(),
            language: self.language.clone(),
        }
    }

    pub fn cycle_params(&self) -> CycleParams {
        CycleParams {
            query: self.query.clone(),
            window_hours: self.hours_back,
            max_pages: self.max_pages,
        }
    }
}

fn invalid(key: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn set_string<F>(lookup: &F, key: &'static str, target: &mut String)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup(key) {
        *target = v.trim().to_string();
    }
}

fn set_parsed<F, T>(lookup: &F, key: &'static str, target: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    if let Some(v) = lookup(key) {
        *target = v
            .trim()
            .parse()
            .map_err(|e: T::Err| invalid(key, &v, &e.to_string()))?;
    }
    Ok(())
}

fn set_optional<F, T>(
    lookup: &F,
    key: &'static str,
    target: &mut Option<T>,
) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    if let Some(v) = lookup(key) {
        let parsed = v
            .trim()
            .parse()
            .map_err(|e: T::Err| invalid(key, &v, &e.to_string()))?;
        *target = Some(parsed);
    }
    Ok(())
}
