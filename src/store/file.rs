//! File-backed collaborator stores.
//!
//! Every store lives in a shared state directory, so separate processes
//! pointed at the same directory see the same marker and the same queue:
//!
//! - `kv.json`: key/value entries (migration markers)
//! - `runs.json`: run records plus the project → platform table
//! - `jobs.json`: queued resume jobs, unique by id
//!
//! Writes go to a temporary sibling file which is then renamed over the
//! target, so readers never observe a half-written file. Read-modify-write
//! cycles hold an exclusive lock on a sibling `.lock` file, which
//! serializes writers across store instances and processes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use fs2::FileExt;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::fs;
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::model::{PausedExecution, ResumeJob, RunStatus};

use super::{JobQueue, KeyValueStore, RunStore, SubmitOutcome};

const KV_FILE: &str = "kv.json";
const RUNS_FILE: &str = "runs.json";
const JOBS_FILE: &str = "jobs.json";

/// Distinguishes temporary files of concurrent writers within a process.
static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Reads a JSON file, returning the default value when it does not exist.
async fn read_json_or_default<T>(path: &Path) -> Result<T, StoreError>
where
    T: DeserializeOwned + Default,
{
    match fs::read_to_string(path).await {
        Ok(content) if content.trim().is_empty() => Ok(T::default()),
        Ok(content) => Ok(serde_json::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(e.into()),
    }
}

/// Writes a JSON file through a temporary sibling and an atomic rename.
async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension(format!(
        "json.{}.{}.tmp",
        std::process::id(),
        TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    fs::write(&tmp, json).await?;
    fs::rename(&tmp, path).await?;
    debug!("Wrote {}", path.display());
    Ok(())
}

/// Exclusive advisory lock on a file, released when dropped.
struct FileLock {
    file: std::fs::File,
}

impl FileLock {
    /// Blocks (off the runtime threads) until the lock at `path` is held.
    async fn acquire(path: PathBuf) -> Result<Self, StoreError> {
        let file = tokio::task::spawn_blocking(move || -> std::io::Result<std::fs::File> {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(&path)?;
            FileExt::lock_exclusive(&file)?;
            Ok(file)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("lock task failed: {}", e)))??;

        Ok(Self { file })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!("Failed to release store lock: {}", e);
        }
    }
}

/// Path of the lock file guarding `path`.
fn lock_path(path: &Path) -> PathBuf {
    path.with_extension("lock")
}

pub struct FileKeyValueStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileKeyValueStore {
    pub fn new(state_dir: impl AsRef<Path>) -> Self {
        Self {
            path: state_dir.as_ref().join(KV_FILE),
            write_lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries: HashMap<String, String> = read_json_or_default(&self.path).await?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let _lock = FileLock::acquire(lock_path(&self.path)).await?;
        let mut entries: HashMap<String, String> = read_json_or_default(&self.path).await?;
        entries.insert(key.to_string(), value.to_string());
        write_json(&self.path, &entries).await
    }
}

/// Contents of `runs.json`.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct RunSnapshot {
    #[serde(default)]
    pub runs: Vec<PausedExecution>,

    /// Project id → platform id
    #[serde(default)]
    pub projects: HashMap<String, String>,
}

/// `runs.json` with records left unparsed, so one bad record can be
/// skipped without losing the rest.
#[derive(Deserialize, Default)]
struct RawRunSnapshot {
    #[serde(default)]
    runs: Vec<Value>,

    #[serde(default)]
    projects: HashMap<String, String>,
}

pub struct FileRunStore {
    path: PathBuf,
}

impl FileRunStore {
    pub fn new(state_dir: impl AsRef<Path>) -> Self {
        Self {
            path: state_dir.as_ref().join(RUNS_FILE),
        }
    }

    /// Replaces the stored snapshot.
    pub async fn save(&self, snapshot: &RunSnapshot) -> Result<(), StoreError> {
        write_json(&self.path, snapshot).await
    }
}

#[async_trait]
impl RunStore for FileRunStore {
    async fn list_by_status(&self, status: RunStatus) -> Result<Vec<PausedExecution>, StoreError> {
        let snapshot: RawRunSnapshot = read_json_or_default(&self.path).await?;

        let mut runs = Vec::new();
        for (index, record) in snapshot.runs.into_iter().enumerate() {
            match serde_json::from_value::<PausedExecution>(record) {
                Ok(run) if run.status == status => runs.push(run),
                Ok(_) => {}
                Err(e) => warn!(
                    "Skipping unreadable run record #{} in {}: {}",
                    index,
                    self.path.display(),
                    e
                ),
            }
        }
        Ok(runs)
    }

    async fn get_platform_id(&self, project_id: &str) -> Result<String, StoreError> {
        let snapshot: RawRunSnapshot = read_json_or_default(&self.path).await?;
        snapshot
            .projects
            .get(project_id)
            .cloned()
            .ok_or_else(|| StoreError::ProjectNotFound(project_id.to_string()))
    }
}

pub struct FileJobQueue {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileJobQueue {
    pub fn new(state_dir: impl AsRef<Path>) -> Self {
        Self {
            path: state_dir.as_ref().join(JOBS_FILE),
            write_lock: Mutex::new(()),
        }
    }

    /// Returns every queued job.
    pub async fn jobs(&self) -> Result<Vec<ResumeJob>, StoreError> {
        read_json_or_default(&self.path).await
    }
}

#[async_trait]
impl JobQueue for FileJobQueue {
    async fn submit(&self, job: ResumeJob) -> Result<SubmitOutcome, StoreError> {
        let _guard = self.write_lock.lock().await;
        let _lock = FileLock::acquire(lock_path(&self.path)).await?;
        let mut jobs: Vec<ResumeJob> = read_json_or_default(&self.path).await?;
        if jobs.iter().any(|queued| queued.id == job.id) {
            return Ok(SubmitOutcome::Duplicate);
        }
        jobs.push(job);
        write_json(&self.path, &jobs).await?;
        Ok(SubmitOutcome::Enqueued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        DelayPause, ExecutionMode, JobKind, PauseMetadata, ProgressUpdateType, ResumeJobPayload,
        RunEnvironment, WorkerJobKind,
    };
    use chrono::Utc;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::tempdir;

    fn job(id: &str) -> ResumeJob {
        ResumeJob {
            id: id.to_string(),
            kind: JobKind::OneTime,
            delay: Duration::ZERO,
            payload: ResumeJobPayload {
                project_id: "proj-1".to_string(),
                platform_id: "plat-1".to_string(),
                environment: RunEnvironment::Production,
                schema_version: 4,
                flow_version_id: "fv-1".to_string(),
                execution_id: id.to_string(),
                inbound_request_id: None,
                synchronous_handler_id: None,
                progress_update_type: ProgressUpdateType::None,
                job_kind: WorkerJobKind::ExecuteFlow,
                mode: ExecutionMode::Resume,
                body: serde_json::json!({}),
            },
        }
    }

    #[tokio::test]
    async fn test_missing_files_read_as_empty() {
        let dir = tempdir().unwrap();

        let kv = FileKeyValueStore::new(dir.path());
        assert_eq!(kv.get("refill_paused_runs").await.unwrap(), None);

        let runs = FileRunStore::new(dir.path());
        assert!(runs.list_by_status(RunStatus::Paused).await.unwrap().is_empty());

        let queue = FileJobQueue::new(dir.path());
        assert!(queue.jobs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_marker_visible_to_second_instance() {
        let dir = tempdir().unwrap();

        FileKeyValueStore::new(dir.path())
            .set("refill_paused_runs", "true")
            .await
            .unwrap();

        let other = FileKeyValueStore::new(dir.path());
        assert_eq!(
            other.get("refill_paused_runs").await.unwrap().as_deref(),
            Some("true")
        );
        let leftovers = std::fs::read_dir(dir.path())
            .unwrap()
            .filter(|entry| {
                let name = entry.as_ref().unwrap().file_name();
                name != "kv.json" && name != "kv.lock"
            })
            .count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_run_snapshot_lookup() {
        let dir = tempdir().unwrap();
        let store = FileRunStore::new(dir.path());

        let mut snapshot = RunSnapshot::default();
        snapshot.runs.push(
            PausedExecution::new("run-1", "proj-1", "fv-1")
                .with_pause(PauseMetadata::Delay(DelayPause::until(Utc::now()))),
        );
        snapshot
            .runs
            .push(PausedExecution::new("run-2", "proj-1", "fv-1").with_status(RunStatus::Succeeded));
        snapshot
            .projects
            .insert("proj-1".to_string(), "plat-1".to_string());
        store.save(&snapshot).await.unwrap();

        let paused = store.list_by_status(RunStatus::Paused).await.unwrap();
        assert_eq!(paused.len(), 1);
        assert_eq!(paused[0].id, "run-1");
        assert_eq!(store.get_platform_id("proj-1").await.unwrap(), "plat-1");
        assert!(store.get_platform_id("proj-2").await.is_err());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("jobs.json"), "not json").unwrap();

        let queue = FileJobQueue::new(dir.path());
        assert!(matches!(
            queue.jobs().await,
            Err(StoreError::Serialization(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_separate_queues_on_one_dir_keep_every_job() {
        let dir = tempdir().unwrap();
        let queues = [
            Arc::new(FileJobQueue::new(dir.path())),
            Arc::new(FileJobQueue::new(dir.path())),
        ];

        let mut handles = Vec::new();
        for (instance, queue) in queues.iter().enumerate() {
            for n in 0..50 {
                let queue = Arc::clone(queue);
                let id = format!("run-{}-{}", instance, n);
                handles.push(tokio::spawn(async move { queue.submit(job(&id)).await }));
            }
        }
        let mut enqueued = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap() == SubmitOutcome::Enqueued {
                enqueued += 1;
            }
        }

        let stored = FileJobQueue::new(dir.path()).jobs().await.unwrap();
        let ids: HashSet<String> = stored.iter().map(|job| job.id.clone()).collect();
        assert_eq!(enqueued, 100);
        assert_eq!(stored.len(), 100);
        assert_eq!(ids.len(), 100);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_separate_queues_reject_same_id_once() {
        let dir = tempdir().unwrap();
        let first = Arc::new(FileJobQueue::new(dir.path()));
        let second = Arc::new(FileJobQueue::new(dir.path()));

        let mut handles = Vec::new();
        for queue in [first, second] {
            for _ in 0..10 {
                let queue = Arc::clone(&queue);
                handles.push(tokio::spawn(async move { queue.submit(job("run-1")).await }));
            }
        }
        let mut enqueued = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap() == SubmitOutcome::Enqueued {
                enqueued += 1;
            }
        }

        assert_eq!(enqueued, 1);
        assert_eq!(FileJobQueue::new(dir.path()).jobs().await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_separate_key_value_stores_keep_every_key() {
        let dir = tempdir().unwrap();
        let stores = [
            Arc::new(FileKeyValueStore::new(dir.path())),
            Arc::new(FileKeyValueStore::new(dir.path())),
        ];

        let mut handles = Vec::new();
        for (instance, store) in stores.iter().enumerate() {
            for n in 0..20 {
                let store = Arc::clone(store);
                let key = format!("marker-{}-{}", instance, n);
                handles.push(tokio::spawn(async move { store.set(&key, "true").await }));
            }
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let reader = FileKeyValueStore::new(dir.path());
        for instance in 0..2 {
            for n in 0..20 {
                let key = format!("marker-{}-{}", instance, n);
                assert!(reader.get(&key).await.unwrap().is_some(), "lost {}", key);
            }
        }
    }

    #[tokio::test]
    async fn test_unreadable_run_record_skipped() {
        let dir = tempdir().unwrap();
        let runs = serde_json::json!({
            "runs": [
                {"id": "broken", "status": "PAUSED"},
                {
                    "id": "healthy",
                    "status": "PAUSED",
                    "projectId": "proj-1",
                    "environment": "PRODUCTION",
                    "flowVersionId": "fv-1",
                    "pauseMetadata": {"type": "DELAY", "resumeDateTime": "2026-10-18T12:00:00Z"}
                }
            ],
            "projects": {"proj-1": "plat-1"}
        });
        std::fs::write(dir.path().join("runs.json"), runs.to_string()).unwrap();

        let store = FileRunStore::new(dir.path());
        let paused = store.list_by_status(RunStatus::Paused).await.unwrap();

        assert_eq!(paused.len(), 1);
        assert_eq!(paused[0].id, "healthy");
        assert_eq!(store.get_platform_id("proj-1").await.unwrap(), "plat-1");
    }
}
