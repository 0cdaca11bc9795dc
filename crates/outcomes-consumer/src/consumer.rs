//! The batching consumption loop — poll → decode → accumulate → flush → commit.
//!
//! The transport itself (partitions, offsets, rebalancing) lives behind the
//! `MessageSource` seam. This loop owns only the batching cadence: it fills a
//! batch until a size or time threshold, hands it to the `BatchProcessor`,
//! and commits the source once the batch barrier has returned.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

use outcomes_core::decoder::decode;
use outcomes_core::error::SourceError;
use outcomes_core::metrics::MetricsSink;
use outcomes_core::types::OutcomeRecord;
use std::sync::Arc;

use crate::config::ConsumerConfig;
use crate::processor::BatchProcessor;

/// The transport seam: an at-least-once stream of opaque payloads.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Pull the next raw payload. `Ok(None)` means nothing is available
    /// right now; the loop backs off and re-polls.
    async fn poll(&self) -> Result<Option<Vec<u8>>, SourceError>;

    /// Commit consumption progress up to the last flushed batch.
    ///
    /// Called only after `BatchProcessor::process` has returned, i.e. after
    /// every record in the batch completed its pipeline.
    async fn commit(&self) -> Result<(), SourceError>;
}

/// Batch-driven consumer over a `MessageSource`.
pub struct OutcomesConsumer<S: MessageSource> {
    config: ConsumerConfig,
    source: S,
    processor: BatchProcessor,
    metrics: Arc<dyn MetricsSink>,
    stopping: AtomicBool,
}

impl<S: MessageSource> OutcomesConsumer<S> {
    pub fn new(
        config: ConsumerConfig,
        source: S,
        processor: BatchProcessor,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            config,
            source,
            processor,
            metrics,
            stopping: AtomicBool::new(false),
        }
    }

    /// Request a graceful stop: the batch currently filling is flushed and
    /// committed, then the processor is shut down and `run` returns.
    ///
    /// Safe to call from another task or from a termination handler.
    pub fn stop(&self) {
        self.stopping.store(true, Ordering::SeqCst);
    }

    /// Run the consumption loop until `stop()` or a transport failure.
    ///
    /// A malformed payload is logged, counted, and skipped — it never aborts
    /// the batch. A `SourceError` from poll/commit is the only fatal path.
    pub async fn run(&self) -> Result<(), SourceError> {
        info!(
            id = %self.config.id,
            topic = %self.config.topic,
            concurrency = self.config.concurrency,
            "Outcomes consumer starting"
        );

        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);
        let max_batch_time = Duration::from_millis(self.config.max_batch_time_ms);

        loop {
            let mut batch: Vec<OutcomeRecord> = Vec::with_capacity(self.config.max_batch_size);
            let deadline = Instant::now() + max_batch_time;

            while batch.len() < self.config.max_batch_size
                && Instant::now() < deadline
                && !self.stopping.load(Ordering::SeqCst)
            {
                match self.source.poll().await? {
                    Some(payload) => match decode(&payload) {
                        Ok(record) => batch.push(record),
                        Err(e) => {
                            error!(error = %e, "Skipping malformed outcome payload");
                            self.metrics.incr("outcomes_consumer.invalid_payload", &[]);
                        }
                    },
                    None => {
                        if self.stopping.load(Ordering::SeqCst) {
                            break;
                        }
                        tokio::time::sleep(poll_interval).await;
                    }
                }
            }

            if !batch.is_empty() {
                debug!(batch_len = batch.len(), "Flushing batch");
                self.processor.process(batch).await;
                // The barrier above is what makes this commit safe.
                self.source.commit().await?;
            }

            if self.stopping.load(Ordering::SeqCst) {
                self.processor.shutdown();
                info!(id = %self.config.id, "Outcomes consumer stopped");
                return Ok(());
            }
        }
    }
}
