//! Metrics seam — counters and timing samples emitted by the consumer.
//!
//! The sink is an injected collaborator so deployments can bridge to their
//! own telemetry stack; the in-memory sink exists for tests and local runs.

use std::collections::HashMap;
use std::sync::Mutex;

/// Named counter + timing sink.
pub trait MetricsSink: Send + Sync {
    /// Increment a counter by one, tagged with key/value pairs.
    fn incr(&self, name: &str, tags: &[(&str, &str)]);

    /// Record one timing sample, in seconds.
    fn timing(&self, name: &str, seconds: f64);
}

/// Sink that discards everything.
#[derive(Default)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn incr(&self, _name: &str, _tags: &[(&str, &str)]) {}
    fn timing(&self, _name: &str, _seconds: f64) {}
}

// ─── In-memory sink ──────────────────────────────────────────────────────────

/// In-memory sink with snapshot accessors, for tests and local inspection.
#[derive(Default)]
pub struct MemoryMetrics {
    counters: Mutex<HashMap<String, u64>>,
    timings: Mutex<HashMap<String, Vec<f64>>>,
}

impl MemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn series_key(name: &str, tags: &[(&str, &str)]) -> String {
        if tags.is_empty() {
            return name.to_string();
        }
        let mut key = name.to_string();
        for (k, v) in tags {
            key.push_str(&format!(",{k}={v}"));
        }
        key
    }

    /// Current value of a counter series (0 if never incremented).
    pub fn counter(&self, name: &str, tags: &[(&str, &str)]) -> u64 {
        self.counters
            .lock()
            .unwrap()
            .get(&Self::series_key(name, tags))
            .copied()
            .unwrap_or(0)
    }

    /// Sum of a counter across all tag combinations.
    pub fn counter_total(&self, name: &str) -> u64 {
        self.counters
            .lock()
            .unwrap()
            .iter()
            .filter(|(key, _)| key.as_str() == name || key.starts_with(&format!("{name},")))
            .map(|(_, v)| v)
            .sum()
    }

    /// All timing samples recorded for a series.
    pub fn timings(&self, name: &str) -> Vec<f64> {
        self.timings
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .unwrap_or_default()
    }
}

impl MetricsSink for MemoryMetrics {
    fn incr(&self, name: &str, tags: &[(&str, &str)]) {
        *self
            .counters
            .lock()
            .unwrap()
            .entry(Self::series_key(name, tags))
            .or_insert(0) += 1;
    }

    fn timing(&self, name: &str, seconds: f64) {
        self.timings
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_default()
            .push(seconds);
    }
}
