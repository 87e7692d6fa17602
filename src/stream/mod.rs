// src/stream/mod.rs
//! Delivery of canonical records to the append-only stream.

#[cfg(feature = "kinesis")]
pub mod kinesis;

use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;

use crate::error::StreamError;
use crate::ingest::types::CanonicalRecord;

/// Largest batch the stream accepts in one request.
pub const MAX_CHUNK_SIZE: usize = 500;

/// One payload plus the key the stream shards on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEntry {
    pub data: Vec<u8>,
    pub partition_key: String,
}

impl StreamEntry {
    pub fn from_record(rec: &CanonicalRecord) -> Result<Self, StreamError> {
        Ok(Self {
            data: serde_json::to_vec(rec)?,
            partition_key: rec.id.clone(),
        })
    }
}

/// Result of a multi-record put.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPutResult {
    /// Per-record results the service returned.
    pub records: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamStatus {
    Creating,
    Deleting,
    Active,
    Updating,
    Other(String),
}

impl StreamStatus {
    pub fn from_wire(s: &str) -> Self {
        match s {
            "CREATING" => Self::Creating,
            "DELETING" => Self::Deleting,
            "ACTIVE" => Self::Active,
            "UPDATING" => Self::Updating,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn accepts_writes(&self) -> bool {
        matches!(self, Self::Active | Self::Updating)
    }
}

#[async_trait]
pub trait StreamApi: Send + Sync {
    async fn put_record(&self, entry: StreamEntry) -> Result<(), StreamError>;
    async fn put_records(&self, entries: Vec<StreamEntry>) -> Result<BatchPutResult, StreamError>;
    async fn describe(&self) -> Result<StreamStatus, StreamError>;
    fn stream_name(&self) -> &str;
}

/// Per-cycle delivery counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub delivered: usize,
    pub failed: usize,
}

impl std::ops::AddAssign for DeliveryOutcome {
    fn add_assign(&mut self, rhs: Self) {
        self.delivered += rhs.delivered;
        self.failed += rhs.failed;
    }
}

pub struct Writer<S> {
    stream: S,
    chunk_size: usize,
    chunk_delay: Duration,
    record_delay: Duration,
}

impl<S: StreamApi> Writer<S> {
    pub fn new(stream: S, chunk_size: usize) -> Self {
        Self {
            stream,
            chunk_size: chunk_size.clamp(1, MAX_CHUNK_SIZE),
            chunk_delay: Duration::from_millis(100),
            record_delay: Duration::from_millis(10),
        }
    }

    pub fn with_delays(mut self, chunk_delay: Duration, record_delay: Duration) -> Self {
        self.chunk_delay = chunk_delay;
        self.record_delay = record_delay;
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn stream(&self) -> &S {
        &self.stream
    }

    /// Deliver every record, batched when there is more than one. Never fails:
    /// transport and service errors become failed counts.
    pub async fn deliver(&self, records: &[CanonicalRecord]) -> DeliveryOutcome {
        let outcome = match records.len() {
            0 => {
                tracing::warn!("no records to deliver");
                return DeliveryOutcome::default();
            }
            1 => self.deliver_single(records).await,
            _ => self.deliver_batched(records).await,
        };
        counter!("ingest_delivered_total").increment(outcome.delivered as u64);
        counter!("ingest_delivery_failed_total").increment(outcome.failed as u64);
        outcome
    }

    async fn deliver_batched(&self, records: &[CanonicalRecord]) -> DeliveryOutcome {
        let mut total = DeliveryOutcome::default();
        let mut chunks = records.chunks(self.chunk_size).peekable();
        while let Some(chunk) = chunks.next() {
            total += self.put_chunk(chunk).await;
            if chunks.peek().is_some() {
                tokio::time::sleep(self.chunk_delay).await;
            }
        }
        total
    }

    async fn put_chunk(&self, chunk: &[CanonicalRecord]) -> DeliveryOutcome {
        let mut encode_failed = 0usize;
        let mut entries = Vec::with_capacity(chunk.len());
        for rec in chunk {
            match StreamEntry::from_record(rec) {
                Ok(entry) => entries.push(entry),
                Err(error) => {
                    tracing::error!(%error, article_id = %rec.id, "dropping record from batch");
                    encode_failed += 1;
                }
            }
        }
        if entries.is_empty() {
            return DeliveryOutcome {
                delivered: 0,
                failed: encode_failed,
            };
        }

        let sent = entries.len();
        match self.stream.put_records(entries).await {
            Ok(res) => {
                let delivered = res.records.saturating_sub(res.failed);
                if res.failed > 0 {
                    tracing::warn!(
                        failed = res.failed,
                        delivered,
                        stream = self.stream.stream_name(),
                        "stream rejected part of a batch"
                    );
                } else {
                    tracing::info!(
                        delivered,
                        stream = self.stream.stream_name(),
                        "batch delivered"
                    );
                }
                DeliveryOutcome {
                    delivered,
                    failed: res.failed + encode_failed,
                }
            }
            Err(error) => {
                tracing::error!(%error, records = sent, "batch put failed");
                DeliveryOutcome {
                    delivered: 0,
                    failed: sent + encode_failed,
                }
            }
        }
    }

    async fn deliver_single(&self, records: &[CanonicalRecord]) -> DeliveryOutcome {
        let mut total = DeliveryOutcome::default();
        for (i, rec) in records.iter().enumerate() {
            let res = match StreamEntry::from_record(rec) {
                Ok(entry) => self.stream.put_record(entry).await,
                Err(e) => Err(e),
            };
            match res {
                Ok(()) => {
                    tracing::debug!(article_id = %rec.id, "record delivered");
                    total.delivered += 1;
                }
                Err(error) => {
                    tracing::error!(%error, article_id = %rec.id, "record put failed");
                    total.failed += 1;
                }
            }
            if i + 1 < records.len() {
                tokio::time::sleep(self.record_delay).await;
            }
        }
        total
    }

    /// Startup health check: the stream exists and accepts writes.
    pub async fn test_connection(&self) -> bool {
        let stream = self.stream.stream_name();
        match self.stream.describe().await {
            Ok(status) => {
                tracing::info!(stream, ?status, "stream status");
                status.accepts_writes()
            }
            Err(StreamError::NotFound(_)) => {
                tracing::error!(stream, "stream not found");
                false
            }
            Err(error) => {
                tracing::error!(%error, stream, "error connecting to stream");
                false
            }
        }
    }
}
