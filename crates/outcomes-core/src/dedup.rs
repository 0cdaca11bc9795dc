//! Dedup memory — remembers that a signal was already forwarded.
//!
//! The marker for a `(project_id, event_id)` pair is written once,
//! immediately after the signal goes out, and expires after `SIGNAL_TTL`.
//! Within that window any redelivery of the same pair is a no-op; after
//! expiry a genuine redelivery would forward again — an accepted, bounded
//! risk of the at-least-once transport, not a bug.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::OutcomeError;

/// How long a "signal already sent" marker lives.
pub const SIGNAL_TTL: Duration = Duration::from_secs(3600);

/// Composite dedup key for a `(project_id, event_id)` pair.
///
/// An absent event id is keyed as `"none"`, so absent-id records within a
/// project dedupe against each other for the TTL window.
pub fn signal_key(project_id: u64, event_id: Option<&str>) -> String {
    format!("signal:{}:{}", project_id, event_id.unwrap_or("none"))
}

/// Shared, TTL-bounded, thread-safe marker store.
///
/// Workers only read (`is_marked`) and insert (`mark`) — never delete or
/// mutate existing entries — so concurrent access needs no coordination
/// beyond the store's own internal synchronization.
#[async_trait]
pub trait DedupStore: Send + Sync {
    /// Returns `true` if a marker exists (and has not expired) for the pair.
    async fn is_marked(
        &self,
        project_id: u64,
        event_id: Option<&str>,
    ) -> Result<bool, OutcomeError>;

    /// Write a marker for the pair with the given expiry.
    async fn mark(
        &self,
        project_id: u64,
        event_id: Option<&str>,
        ttl: Duration,
    ) -> Result<(), OutcomeError>;
}

// ─── In-memory store ─────────────────────────────────────────────────────────

/// In-process dedup store with lazy expiry.
///
/// Suitable for tests and single-process deployments; a shared cache
/// implementation of `DedupStore` takes its place in multi-consumer setups.
#[derive(Default)]
pub struct MemoryDedupStore {
    markers: Mutex<HashMap<String, Instant>>,
}

impl MemoryDedupStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) markers.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.markers
            .lock()
            .unwrap()
            .values()
            .filter(|expiry| **expiry > now)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DedupStore for MemoryDedupStore {
    async fn is_marked(
        &self,
        project_id: u64,
        event_id: Option<&str>,
    ) -> Result<bool, OutcomeError> {
        let key = signal_key(project_id, event_id);
        let mut markers = self.markers.lock().unwrap();
        match markers.get(&key) {
            Some(expiry) if *expiry > Instant::now() => Ok(true),
            Some(_) => {
                // Expired — drop it on the way out.
                markers.remove(&key);
                Ok(false)
            }
            None => Ok(false),
        }
    }

    async fn mark(
        &self,
        project_id: u64,
        event_id: Option<&str>,
        ttl: Duration,
    ) -> Result<(), OutcomeError> {
        let key = signal_key(project_id, event_id);
        self.markers.lock().unwrap().insert(key, Instant::now() + ttl);
        Ok(())
    }
}
