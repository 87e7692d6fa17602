// tests/config_env.rs
use std::{env, fs};

use news_stream_ingest::config::{LogFormat, Settings, ENV_CONFIG_PATH};
use news_stream_ingest::error::ConfigError;

const KEYS: &[&str] = &[
    ENV_CONFIG_PATH,
    "NEWSAPI_KEY",
    "NEWSAPI_BASE_URL",
    "NEWSAPI_QUERY",
    "NEWSAPI_PAGE_SIZE",
    "NEWSAPI_SORT_BY",
    "NEWSAPI_LANGUAGE",
    "NEWSAPI_HOURS_BACK",
    "NEWSAPI_MAX_PAGES",
    "NEWSAPI_TIMEOUT_SECS",
    "NEWSAPI_PAGE_DELAY_MS",
    "AWS_REGION",
    "AWS_ENDPOINT_URL",
    "KINESIS_STREAM_NAME",
    "KINESIS_BATCH_SIZE",
    "POLL_INTERVAL_SECONDS",
    "MAX_ITERATIONS",
    "LOG_LEVEL",
    "LOG_FORMAT",
    "METRICS_ADDR",
];

fn clear_env() {
    for k in KEYS {
        env::remove_var(k);
    }
}

#[serial_test::serial]
#[test]
fn env_overrides_defaults() {
    clear_env();
    env::set_var("NEWSAPI_KEY", "abc");
    env::set_var("NEWSAPI_QUERY", "rust");
    env::set_var("NEWSAPI_MAX_PAGES", "3");
    env::set_var("KINESIS_BATCH_SIZE", "250");
    env::set_var("LOG_FORMAT", "json");
    env::set_var("METRICS_ADDR", "127.0.0.1:9000");

    let s = Settings::from_env().unwrap();
    assert_eq!(s.newsapi_key, "abc");
    assert_eq!(s.query, "rust");
    assert_eq!(s.max_pages, Some(3));
    assert_eq!(s.batch_size, 250);
    assert_eq!(s.log_format, LogFormat::Json);
    assert_eq!(s.metrics_addr, Some("127.0.0.1:9000".parse().unwrap()));
    clear_env();
}

#[serial_test::serial]
#[test]
fn toml_file_is_layered_under_env() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("ingest.toml");
    fs::write(
        &p,
        r#"
newsapi_key = "from-file"
query = "climate"
page_size = 50
stream_name = "file-stream"
poll_interval_secs = 60
"#,
    )
    .unwrap();
    env::set_var(ENV_CONFIG_PATH, p.display().to_string());
    env::set_var("NEWSAPI_QUERY", "energy");

    let s = Settings::from_env().unwrap();
    assert_eq!(s.newsapi_key, "from-file");
    assert_eq!(s.query, "energy");
    assert_eq!(s.page_size, 50);
    assert_eq!(s.stream_name, "file-stream");
    assert_eq!(s.poll_interval_secs, 60);
    assert_eq!(s.language, "en");
    clear_env();
}

#[serial_test::serial]
#[test]
fn unknown_file_key_and_missing_file_are_errors() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("bad.toml");
    fs::write(&p, "newsapi_key = \"k\"\nnot_a_setting = 1\n").unwrap();
    env::set_var(ENV_CONFIG_PATH, p.display().to_string());
    assert!(matches!(Settings::from_env(), Err(ConfigError::File { .. })));

    env::set_var(ENV_CONFIG_PATH, dir.path().join("missing.toml").display().to_string());
    assert!(matches!(Settings::from_env(), Err(ConfigError::File { .. })));
    clear_env();
}

#[serial_test::serial]
#[test]
fn empty_stream_name_in_file_is_fatal() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("ingest.toml");
    fs::write(&p, "newsapi_key = \"k\"\nstream_name = \"\"\n").unwrap();
    env::set_var(ENV_CONFIG_PATH, p.display().to_string());
    assert!(matches!(
        Settings::from_env(),
        Err(ConfigError::Missing("KINESIS_STREAM_NAME"))
    ));
    clear_env();
}

#[serial_test::serial]
#[test]
fn cleared_env_yields_plain_defaults() {
    clear_env();
    env::set_var("NEWSAPI_KEY", "k");
    let s = Settings::from_env().unwrap();
    assert_eq!(s.aws_region, "us-east-1");
    assert!(s.aws_endpoint_url.is_none());
    assert!(s.max_iterations.is_none());
    assert_eq!(s.hours_back, 24);
    assert_eq!(s.log_level, "info");
    clear_env();
}
