//! Consumer configuration.

use serde::{Deserialize, Serialize};

/// Configuration for a consumer instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumerConfig {
    /// Unique name for this consumer (used in logs).
    pub id: String,
    /// Topic/stream the external transport polls.
    pub topic: String,
    /// Worker pool size for per-record fan-out within a batch.
    pub concurrency: usize,
    /// Flush the batch once it holds this many records.
    pub max_batch_size: usize,
    /// Flush the batch once this much time has passed since it started
    /// filling, even if it is not full (milliseconds).
    pub max_batch_time_ms: u64,
    /// How long to wait before re-polling an idle source (milliseconds).
    pub poll_interval_ms: u64,
    /// Lifetime of a "signal already sent" dedup marker (seconds).
    pub dedup_ttl_secs: u64,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            id: "default".into(),
            topic: "outcomes".into(),
            concurrency: 4,
            max_batch_size: 500,
            max_batch_time_ms: 1000,
            poll_interval_ms: 100,
            dedup_ttl_secs: 3600,
        }
    }
}
