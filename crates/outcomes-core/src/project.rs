//! Project lookup — external store trait plus a batch-scoped cache.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::OutcomeError;
use crate::types::Project;

/// Trait for resolving projects by id.
///
/// A `None` result is a terminal failure for the record being processed
/// (logged and dropped), never for the whole batch.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn get(&self, project_id: u64) -> Result<Option<Project>, OutcomeError>;
}

// ─── Batch-scoped cache ──────────────────────────────────────────────────────

/// Read-through project cache scoped to the lifetime of one batch.
///
/// Created at batch start and discarded at batch end, so repeated lookups for
/// the same project within a batch hit the store once. Purely a performance
/// aid — correctness never depends on it.
///
/// Misses are not cached: a redelivered record retries the lookup, which lets
/// transient store failures self-heal across redeliveries.
pub struct ProjectCache {
    store: Arc<dyn ProjectStore>,
    cache: Mutex<HashMap<u64, Arc<Project>>>,
}

impl ProjectCache {
    pub fn new(store: Arc<dyn ProjectStore>) -> Self {
        Self {
            store,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve a project, consulting the batch cache first.
    pub async fn get(&self, project_id: u64) -> Result<Option<Arc<Project>>, OutcomeError> {
        if let Some(project) = self.cache.lock().unwrap().get(&project_id) {
            return Ok(Some(Arc::clone(project)));
        }
        match self.store.get(project_id).await? {
            Some(project) => {
                let project = Arc::new(project);
                self.cache
                    .lock()
                    .unwrap()
                    .insert(project_id, Arc::clone(&project));
                Ok(Some(project))
            }
            None => Ok(None),
        }
    }
}

// ─── In-memory store ─────────────────────────────────────────────────────────

/// In-process project store for tests and embedded setups.
#[derive(Default)]
pub struct MemoryProjectStore {
    projects: Mutex<HashMap<u64, Project>>,
}

impl MemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, project: Project) {
        self.projects.lock().unwrap().insert(project.id, project);
    }
}

#[async_trait]
impl ProjectStore for MemoryProjectStore {
    async fn get(&self, project_id: u64) -> Result<Option<Project>, OutcomeError> {
        Ok(self.projects.lock().unwrap().get(&project_id).cloned())
    }
}
