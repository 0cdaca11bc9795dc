//! outcomes-core — foundation for the outcome signal-forwarding consumer.
//!
//! # Architecture
//!
//! ```text
//! ConsumerBuilder → BatchProcessor
//!                       ├── decoder       (raw payload → OutcomeRecord)
//!                       ├── DedupStore    (TTL "signal already sent" markers)
//!                       ├── ProjectStore  (cached project lookup)
//!                       ├── SignalHub     (robust listener fan-out)
//!                       └── MetricsSink   (counters + timings)
//! ```

pub mod decoder;
pub mod dedup;
pub mod error;
pub mod metrics;
pub mod project;
pub mod signal;
pub mod types;

pub use decoder::decode;
pub use dedup::{DedupStore, MemoryDedupStore, SIGNAL_TTL};
pub use error::{DecodeError, OutcomeError, SignalError, SourceError};
pub use metrics::{MemoryMetrics, MetricsSink, NoopMetrics};
pub use project::{MemoryProjectStore, ProjectCache, ProjectStore};
pub use signal::{Signal, SignalHub, SignalListener};
pub use types::{OutcomeKind, OutcomeRecord, Project};
