//! The batch processor — per-record pipeline with bounded fan-out.
//!
//! # Pipeline (one record)
//! 1. `project_id == 0` → no-op (valid "no project" case)
//! 2. Kind not actionable → no-op
//! 3. Dedup marker present → no-op (redelivered, already forwarded)
//! 4. Resolve project via the batch-scoped cache; miss → log and drop
//! 5. Forward the signal to all listeners (robust dispatch)
//! 6. Mark the dedup memory — strictly AFTER the signal went out, so a crash
//!    causes re-processing on redelivery, never silent loss
//! 7. Record delivery lag and the `signal_sent` counter
//!
//! No error in this pipeline is fatal to the batch. `process` returns only
//! after every record has finished; the caller treats that as "batch durably
//! processed" and commits its source offset.

use futures::StreamExt;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{error, warn};

use outcomes_core::dedup::{signal_key, DedupStore};
use outcomes_core::metrics::MetricsSink;
use outcomes_core::project::{ProjectCache, ProjectStore};
use outcomes_core::signal::{Signal, SignalHub};
use outcomes_core::types::{OutcomeKind, OutcomeRecord};

use crate::config::ConsumerConfig;
use crate::lag::delivery_lag;

/// Processes batches of decoded outcome records.
///
/// Holds no state across batches other than the injected collaborator
/// stores; batches are processed strictly one at a time.
pub struct BatchProcessor {
    concurrency: usize,
    dedup_ttl: Duration,
    dedup: Arc<dyn DedupStore>,
    projects: Arc<dyn ProjectStore>,
    signals: Arc<SignalHub>,
    metrics: Arc<dyn MetricsSink>,
    closed: AtomicBool,
}

impl BatchProcessor {
    pub fn new(
        config: &ConsumerConfig,
        dedup: Arc<dyn DedupStore>,
        projects: Arc<dyn ProjectStore>,
        signals: Arc<SignalHub>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            concurrency: config.concurrency.max(1),
            dedup_ttl: Duration::from_secs(config.dedup_ttl_secs),
            dedup,
            projects,
            signals,
            metrics,
            closed: AtomicBool::new(false),
        }
    }

    /// Process one batch to completion.
    ///
    /// Records are stable-sorted by project id first, purely for lookup
    /// locality; completion order across workers carries no guarantee. The
    /// returned future resolves only once every record's pipeline has run —
    /// that await is the batch barrier.
    pub async fn process(&self, mut batch: Vec<OutcomeRecord>) {
        if self.closed.load(Ordering::SeqCst) {
            warn!(batch_len = batch.len(), "Processor is shut down; dropping batch");
            return;
        }

        sort_for_locality(&mut batch);

        // Request-scoped: reset at batch start, discarded at batch end.
        let cache = ProjectCache::new(Arc::clone(&self.projects));
        let cache = &cache;
        let claims = BatchClaims::default();
        let claims = &claims;

        futures::stream::iter(batch)
            .for_each_concurrent(self.concurrency, |record| async move {
                let start = Instant::now();
                self.process_record(record, cache, claims).await;
                self.metrics.timing(
                    "outcomes_consumer.process_message",
                    start.elapsed().as_secs_f64(),
                );
            })
            .await;
    }

    /// Stop accepting new batches. In-flight work is left to finish — this
    /// is a cleanup hook, not a cancellation.
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once `shutdown` has been called.
    pub fn is_shut_down(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn process_record(
        &self,
        record: OutcomeRecord,
        cache: &ProjectCache,
        claims: &BatchClaims,
    ) {
        if record.project_id == 0 {
            return; // no project — valid, ignore silently
        }
        if !record.kind.is_actionable() {
            return;
        }

        let event_id = record.event_id.as_deref();

        // Within a batch the TTL store's check/mark pair would race across
        // workers, so duplicates inside one batch are claimed atomically.
        if !claims.claim(&signal_key(record.project_id, event_id)) {
            return;
        }

        // Dedup failures fail open: a bounded duplicate beats a lost signal.
        match self.dedup.is_marked(record.project_id, event_id).await {
            Ok(true) => return, // already forwarded
            Ok(false) => {}
            Err(e) => {
                error!(
                    project_id = record.project_id,
                    error = %e,
                    "Dedup check failed; proceeding as unmarked"
                );
            }
        }

        let project = match cache.get(record.project_id).await {
            Ok(Some(project)) => project,
            Ok(None) => {
                error!(
                    project_id = record.project_id,
                    "Outcomes consumer could not find project"
                );
                return;
            }
            Err(e) => {
                error!(
                    project_id = record.project_id,
                    error = %e,
                    "Project lookup failed"
                );
                return;
            }
        };

        let signal = match record.kind {
            OutcomeKind::Filtered => Signal::Filtered {
                project: (*project).clone(),
                remote_addr: record.remote_addr.clone(),
            },
            OutcomeKind::RateLimited => Signal::Dropped {
                project: (*project).clone(),
                remote_addr: record.remote_addr.clone(),
                reason: record.reason.clone(),
            },
            _ => return, // guarded by is_actionable above
        };

        self.signals.send(&signal).await;

        // Marker goes in only after the signal went out; a crash between the
        // two re-processes on redelivery instead of losing the signal.
        if let Err(e) = self
            .dedup
            .mark(record.project_id, event_id, self.dedup_ttl)
            .await
        {
            error!(
                project_id = record.project_id,
                error = %e,
                "Failed to write dedup marker"
            );
        }

        if let Some(ts) = &record.timestamp {
            match delivery_lag(ts, chrono::Utc::now().naive_utc()) {
                Ok(seconds) => self
                    .metrics
                    .timing("outcomes_consumer.timestamp_lag", seconds),
                Err(e) => warn!(timestamp = %ts, error = %e, "Unparseable outcome timestamp"),
            }
        }

        self.metrics.incr(
            "outcomes_consumer.signal_sent",
            &[
                ("reason", record.reason.as_deref().unwrap_or("none")),
                ("outcome", record.kind.as_str()),
            ],
        );
    }
}

/// Batch-scoped claim set for actionable dedup keys.
///
/// First claimant wins; later records with the same key in the same batch
/// are duplicates regardless of worker interleaving.
#[derive(Default)]
struct BatchClaims(Mutex<HashSet<String>>);

impl BatchClaims {
    fn claim(&self, key: &str) -> bool {
        self.0.lock().unwrap().insert(key.to_string())
    }
}

/// Stable sort by project id, ascending.
///
/// Groups per-project work so project and dedup lookups within a batch hit
/// warm cache entries; ties keep their relative order.
fn sort_for_locality(batch: &mut [OutcomeRecord]) {
    batch.sort_by_key(|record| record.project_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    use outcomes_core::dedup::MemoryDedupStore;
    use outcomes_core::error::{OutcomeError, SignalError};
    use outcomes_core::metrics::MemoryMetrics;
    use outcomes_core::project::MemoryProjectStore;
    use outcomes_core::signal::SignalListener;
    use outcomes_core::types::Project;

    /// Listener that records every signal it receives.
    #[derive(Default)]
    struct Recording {
        signals: Mutex<Vec<Signal>>,
    }

    #[async_trait]
    impl SignalListener for Recording {
        async fn receive(&self, signal: &Signal) -> Result<(), SignalError> {
            self.signals.lock().unwrap().push(signal.clone());
            Ok(())
        }
        fn name(&self) -> &str {
            "recording"
        }
    }

    impl Recording {
        fn received(&self) -> Vec<Signal> {
            self.signals.lock().unwrap().clone()
        }
    }

    struct Harness {
        processor: BatchProcessor,
        listener: Arc<Recording>,
        metrics: Arc<MemoryMetrics>,
    }

    fn harness(projects: &[(u64, &str)]) -> Harness {
        let store = MemoryProjectStore::new();
        for (id, slug) in projects {
            store.insert(Project::new(*id, *slug));
        }
        let listener = Arc::new(Recording::default());
        let mut hub = SignalHub::new();
        hub.register(listener.clone());
        let metrics = Arc::new(MemoryMetrics::new());

        let processor = BatchProcessor::new(
            &ConsumerConfig::default(),
            Arc::new(MemoryDedupStore::new()),
            Arc::new(store),
            Arc::new(hub),
            metrics.clone(),
        );
        Harness {
            processor,
            listener,
            metrics,
        }
    }

    fn record(project_id: u64, kind: OutcomeKind, event_id: &str) -> OutcomeRecord {
        OutcomeRecord {
            project_id,
            kind,
            event_id: Some(event_id.to_string()),
            reason: None,
            remote_addr: Some("1.2.3.4".into()),
            timestamp: None,
        }
    }

    #[test]
    fn sort_is_stable_and_non_decreasing() {
        let mut batch: Vec<OutcomeRecord> = [(3, "a"), (1, "b"), (2, "c"), (1, "d"), (3, "e")]
            .iter()
            .map(|(p, e)| record(*p, OutcomeKind::Filtered, e))
            .collect();

        sort_for_locality(&mut batch);

        let ids: Vec<u64> = batch.iter().map(|r| r.project_id).collect();
        assert_eq!(ids, vec![1, 1, 2, 3, 3]);
        // Same-project records keep their relative order
        let events: Vec<&str> = batch.iter().filter_map(|r| r.event_id.as_deref()).collect();
        assert_eq!(events, vec!["b", "d", "c", "a", "e"]);
    }

    #[tokio::test]
    async fn forwards_filtered_signal() {
        let h = harness(&[(7, "acme")]);
        h.processor
            .process(vec![record(7, OutcomeKind::Filtered, "a")])
            .await;

        let signals = h.listener.received();
        assert_eq!(signals.len(), 1);
        match &signals[0] {
            Signal::Filtered {
                project,
                remote_addr,
            } => {
                assert_eq!(project.id, 7);
                assert_eq!(remote_addr.as_deref(), Some("1.2.3.4"));
            }
            other => panic!("expected filtered signal, got {other:?}"),
        }
        assert_eq!(
            h.metrics.counter_total("outcomes_consumer.signal_sent"),
            1
        );
    }

    #[tokio::test]
    async fn forwards_dropped_signal_with_reason() {
        let h = harness(&[(7, "acme")]);
        let mut r = record(7, OutcomeKind::RateLimited, "a");
        r.reason = Some("key_quota".into());
        h.processor.process(vec![r]).await;

        let signals = h.listener.received();
        assert_eq!(signals.len(), 1);
        match &signals[0] {
            Signal::Dropped { reason, .. } => assert_eq!(reason.as_deref(), Some("key_quota")),
            other => panic!("expected dropped signal, got {other:?}"),
        }
        assert_eq!(
            h.metrics.counter(
                "outcomes_consumer.signal_sent",
                &[("reason", "key_quota"), ("outcome", "rate_limited")]
            ),
            1
        );
    }

    #[tokio::test]
    async fn project_zero_is_a_silent_noop() {
        let h = harness(&[(7, "acme")]);
        h.processor
            .process(vec![record(0, OutcomeKind::RateLimited, "a")])
            .await;

        assert!(h.listener.received().is_empty());
        assert_eq!(h.metrics.counter_total("outcomes_consumer.signal_sent"), 0);
    }

    #[tokio::test]
    async fn non_actionable_kinds_are_skipped() {
        let h = harness(&[(7, "acme")]);
        h.processor
            .process(vec![
                record(7, OutcomeKind::Accepted, "a"),
                record(7, OutcomeKind::Invalid, "b"),
                record(7, OutcomeKind::Abuse, "c"),
                record(7, OutcomeKind::Unknown, "d"),
            ])
            .await;

        assert!(h.listener.received().is_empty());
    }

    #[tokio::test]
    async fn duplicate_within_batch_forwards_once() {
        let h = harness(&[(7, "acme")]);
        h.processor
            .process(vec![
                record(7, OutcomeKind::Filtered, "a"),
                record(7, OutcomeKind::Filtered, "a"),
            ])
            .await;

        assert_eq!(h.listener.received().len(), 1);
    }

    #[tokio::test]
    async fn redelivery_across_batches_forwards_once() {
        let h = harness(&[(7, "acme")]);
        h.processor
            .process(vec![record(7, OutcomeKind::Filtered, "a")])
            .await;
        h.processor
            .process(vec![record(7, OutcomeKind::Filtered, "a")])
            .await;

        assert_eq!(h.listener.received().len(), 1);
    }

    #[tokio::test]
    async fn unknown_project_is_dropped_without_stopping_batch() {
        let h = harness(&[(7, "acme")]);
        h.processor
            .process(vec![
                record(999, OutcomeKind::Filtered, "a"), // no such project
                record(7, OutcomeKind::Filtered, "b"),
            ])
            .await;

        let signals = h.listener.received();
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].project().id, 7);
    }

    #[tokio::test]
    async fn unknown_project_leaves_no_dedup_marker() {
        // A redelivery retries the lookup: if the project appears later
        // (transient store failure healed), the signal still goes out.
        let store = MemoryProjectStore::new();
        let listener = Arc::new(Recording::default());
        let mut hub = SignalHub::new();
        hub.register(listener.clone());
        let projects = Arc::new(store);
        let processor = BatchProcessor::new(
            &ConsumerConfig::default(),
            Arc::new(MemoryDedupStore::new()),
            projects.clone(),
            Arc::new(hub),
            Arc::new(MemoryMetrics::new()),
        );

        processor
            .process(vec![record(7, OutcomeKind::Filtered, "a")])
            .await;
        assert!(listener.received().is_empty());

        projects.insert(Project::new(7, "late"));
        processor
            .process(vec![record(7, OutcomeKind::Filtered, "a")])
            .await;
        assert_eq!(listener.received().len(), 1);
    }

    #[tokio::test]
    async fn lag_sample_recorded_for_parseable_timestamp() {
        let h = harness(&[(7, "acme")]);
        let mut r = record(7, OutcomeKind::Filtered, "a");
        r.timestamp = Some("2024-01-01T00:00:00.000000Z".into());
        h.processor.process(vec![r]).await;

        let samples = h.metrics.timings("outcomes_consumer.timestamp_lag");
        assert_eq!(samples.len(), 1);
        assert!(samples[0] > 0.0);
    }

    #[tokio::test]
    async fn bad_timestamp_does_not_block_forwarding() {
        let h = harness(&[(7, "acme")]);
        let mut r = record(7, OutcomeKind::Filtered, "a");
        r.timestamp = Some("not-a-timestamp".into());
        h.processor.process(vec![r]).await;

        assert_eq!(h.listener.received().len(), 1);
        assert!(h
            .metrics
            .timings("outcomes_consumer.timestamp_lag")
            .is_empty());
        assert_eq!(h.metrics.counter_total("outcomes_consumer.signal_sent"), 1);
    }

    #[tokio::test]
    async fn every_record_is_timed() {
        let h = harness(&[(7, "acme")]);
        h.processor
            .process(vec![
                record(0, OutcomeKind::Filtered, "a"), // even no-ops are timed
                record(7, OutcomeKind::Filtered, "b"),
            ])
            .await;

        assert_eq!(
            h.metrics.timings("outcomes_consumer.process_message").len(),
            2
        );
    }

    #[tokio::test]
    async fn shutdown_rejects_new_batches() {
        let h = harness(&[(7, "acme")]);
        h.processor.shutdown();
        assert!(h.processor.is_shut_down());

        h.processor
            .process(vec![record(7, OutcomeKind::Filtered, "a")])
            .await;
        assert!(h.listener.received().is_empty());
    }

    #[tokio::test]
    async fn failing_project_store_isolates_the_record() {
        struct FlakyStore;

        #[async_trait]
        impl outcomes_core::project::ProjectStore for FlakyStore {
            async fn get(&self, project_id: u64) -> Result<Option<Project>, OutcomeError> {
                if project_id == 13 {
                    return Err(OutcomeError::Store("connection reset".into()));
                }
                Ok(Some(Project::new(project_id, "ok")))
            }
        }

        let listener = Arc::new(Recording::default());
        let mut hub = SignalHub::new();
        hub.register(listener.clone());
        let processor = BatchProcessor::new(
            &ConsumerConfig::default(),
            Arc::new(MemoryDedupStore::new()),
            Arc::new(FlakyStore),
            Arc::new(hub),
            Arc::new(MemoryMetrics::new()),
        );

        processor
            .process(vec![
                record(13, OutcomeKind::Filtered, "a"),
                record(7, OutcomeKind::Filtered, "b"),
            ])
            .await;

        let signals = listener.received();
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].project().id, 7);
    }
}
