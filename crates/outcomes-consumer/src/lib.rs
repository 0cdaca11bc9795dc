//! outcomes-consumer — idempotent batch processing for the outcome stream.
//!
//! # Architecture
//!
//! ```text
//! MessageSource (poll/commit)
//!       │
//! OutcomesConsumer          poll → decode → accumulate → flush → commit
//!       │
//! BatchProcessor            stable sort → bounded fan-out → barrier
//!       │
//! per-record pipeline       filter → dedup check → forward → mark → metrics
//! ```

pub mod builder;
pub mod config;
pub mod consumer;
pub mod lag;
pub mod processor;

pub use builder::ConsumerBuilder;
pub use config::ConsumerConfig;
pub use consumer::{MessageSource, OutcomesConsumer};
pub use lag::{delivery_lag, TIMESTAMP_FORMAT};
pub use processor::BatchProcessor;
