//! Fluent builder API for consumer configuration.
//!
//! # Example
//!
//! ```rust
//! use outcomes_consumer::ConsumerBuilder;
//!
//! let config = ConsumerBuilder::new()
//!     .id("relay-forwarder")
//!     .topic("outcomes")
//!     .concurrency(8)
//!     .max_batch_size(250)
//!     .build_config();
//! ```

use crate::config::ConsumerConfig;

/// Fluent builder for `ConsumerConfig`.
#[derive(Default)]
pub struct ConsumerBuilder {
    config: ConsumerConfig,
}

impl ConsumerBuilder {
    pub fn new() -> Self {
        Self {
            config: ConsumerConfig::default(),
        }
    }

    /// Set the consumer ID (used in logs).
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.config.id = id.into();
        self
    }

    /// Set the topic/stream name the transport polls.
    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.config.topic = topic.into();
        self
    }

    /// Set the worker pool size for per-record fan-out.
    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n;
        self
    }

    /// Set the batch size flush threshold.
    pub fn max_batch_size(mut self, n: usize) -> Self {
        self.config.max_batch_size = n;
        self
    }

    /// Set the batch time flush threshold (milliseconds).
    pub fn max_batch_time_ms(mut self, ms: u64) -> Self {
        self.config.max_batch_time_ms = ms;
        self
    }

    /// Set the idle-source re-poll interval (milliseconds).
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    /// Set the dedup marker lifetime (seconds).
    pub fn dedup_ttl_secs(mut self, secs: u64) -> Self {
        self.config.dedup_ttl_secs = secs;
        self
    }

    /// Build the `ConsumerConfig`.
    pub fn build_config(self) -> ConsumerConfig {
        self.config
    }
}
