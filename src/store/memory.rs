//! In-memory collaborator stores.
//!
//! Cloning a store shares its state, which lets tests hand one copy to the
//! migration and inspect the other.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::model::{PausedExecution, ResumeJob, RunStatus};

use super::{JobQueue, KeyValueStore, RunStore, SubmitOutcome};

#[derive(Clone, Default)]
pub struct MemoryKeyValueStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MemoryRunStore {
    runs: Arc<Mutex<Vec<PausedExecution>>>,
    platforms: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_run(&self, run: PausedExecution) {
        self.runs.lock().await.push(run);
    }

    pub async fn register_project(&self, project_id: &str, platform_id: &str) {
        self.platforms
            .lock()
            .await
            .insert(project_id.to_string(), platform_id.to_string());
    }
}

#[async_trait]
impl RunStore for MemoryRunStore {
    async fn list_by_status(&self, status: RunStatus) -> Result<Vec<PausedExecution>, StoreError> {
        let guard = self.runs.lock().await;
        Ok(guard.iter().filter(|run| run.status == status).cloned().collect())
    }

    async fn get_platform_id(&self, project_id: &str) -> Result<String, StoreError> {
        self.platforms
            .lock()
            .await
            .get(project_id)
            .cloned()
            .ok_or_else(|| StoreError::ProjectNotFound(project_id.to_string()))
    }
}

/// Job queue keeping jobs in submission order, unique by id.
#[derive(Clone, Default)]
pub struct MemoryJobQueue {
    jobs: Arc<Mutex<Vec<ResumeJob>>>,
}

impl MemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of every queued job.
    pub async fn jobs(&self) -> Vec<ResumeJob> {
        self.jobs.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.jobs.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.lock().await.is_empty()
    }
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    async fn submit(&self, job: ResumeJob) -> Result<SubmitOutcome, StoreError> {
        let mut guard = self.jobs.lock().await;
        if guard.iter().any(|queued| queued.id == job.id) {
            return Ok(SubmitOutcome::Duplicate);
        }
        guard.push(job);
        Ok(SubmitOutcome::Enqueued)
    }
}
