// src/stream/kinesis.rs
//! AWS Kinesis adapter (only compiled with the `kinesis` feature).

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_kinesis::config::Region;
use aws_sdk_kinesis::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_kinesis::primitives::Blob;
use aws_sdk_kinesis::types::PutRecordsRequestEntry;
use aws_sdk_kinesis::Client;
use tracing::instrument;

use super::{BatchPutResult, StreamApi, StreamEntry, StreamStatus};
use crate::error::StreamError;

#[derive(Clone)]
pub struct KinesisStream {
    client: Client,
    stream_name: String,
}

impl KinesisStream {
    pub fn new(client: Client, stream_name: impl Into<String>) -> Self {
        Self {
            client,
            stream_name: stream_name.into(),
        }
    }

    /// Build a client from the default credential chain. `endpoint_url` points
    /// at a local emulator (e.g. LocalStack) when set.
    #[instrument(level = "debug", skip(endpoint_url))]
    pub async fn connect(region: &str, endpoint_url: Option<&str>, stream_name: &str) -> Self {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region.to_string()));
        if let Some(endpoint) = endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let shared = loader.load().await;
        Self::new(Client::new(&shared), stream_name)
    }

    fn map_err<E, R>(&self, err: SdkError<E, R>) -> StreamError
    where
        E: ProvideErrorMetadata + std::error::Error + 'static,
        R: std::fmt::Debug,
    {
        match err.code() {
            Some("ResourceNotFoundException") => StreamError::NotFound(self.stream_name.clone()),
            Some(code) => StreamError::Service {
                code: code.to_string(),
                message: err.message().unwrap_or_default().to_string(),
            },
            None => StreamError::Transport(DisplayErrorContext(&err).to_string()),
        }
    }
}

#[async_trait]
impl StreamApi for KinesisStream {
    #[instrument(level = "debug", skip(self, entry), fields(key = %entry.partition_key))]
    async fn put_record(&self, entry: StreamEntry) -> Result<(), StreamError> {
        let out = self
            .client
            .put_record()
            .stream_name(&self.stream_name)
            .data(Blob::new(entry.data))
            .partition_key(entry.partition_key)
            .send()
            .await
            .map_err(|e| self.map_err(e))?;
        tracing::debug!(
            sequence = ?out.sequence_number(),
            shard = ?out.shard_id(),
            "put_record ok"
        );
        Ok(())
    }

    #[instrument(level = "debug", skip(self, entries), fields(n = entries.len()))]
    async fn put_records(&self, entries: Vec<StreamEntry>) -> Result<BatchPutResult, StreamError> {
        let records = entries
            .into_iter()
            .map(|e| {
                PutRecordsRequestEntry::builder()
                    .data(Blob::new(e.data))
                    .partition_key(e.partition_key)
                    .build()
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StreamError::Transport(format!("building put_records entry: {e}")))?;

        let out = self
            .client
            .put_records()
            .stream_name(&self.stream_name)
            .set_records(Some(records))
            .send()
            .await
            .map_err(|e| self.map_err(e))?;

        let failed = out.failed_record_count().unwrap_or(0).max(0) as usize;
        Ok(BatchPutResult {
            records: out.records().len(),
            failed,
        })
    }

    async fn describe(&self) -> Result<StreamStatus, StreamError> {
        let out = self
            .client
            .describe_stream_summary()
            .stream_name(&self.stream_name)
            .send()
            .await
            .map_err(|e| self.map_err(e))?;
        let status = out
            .stream_description_summary()
            .map(|s| StreamStatus::from_wire(s.stream_status().as_str()))
            .unwrap_or_else(|| StreamStatus::Other("UNKNOWN".to_string()));
        Ok(status)
    }

    fn stream_name(&self) -> &str {
        &self.stream_name
    }
}
