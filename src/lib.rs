// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod error;
pub mod ingest;
pub mod stream;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::config::Settings;
pub use crate::error::{ConfigError, FetchError, Rejection, StreamError};
pub use crate::ingest::fetch::{FetchEnd, FetchOutcome, Fetcher};
pub use crate::ingest::scheduler::{Scheduler, SchedulerState, StopHandle};
pub use crate::ingest::types::CanonicalRecord;
pub use crate::ingest::{CycleReport, Pipeline};
pub use crate::stream::{DeliveryOutcome, StreamApi, Writer};
