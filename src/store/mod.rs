//! External Collaborator Interfaces
//!
//! The migration talks to three systems it does not own:
//!
//! - [`RunStore`]: persistent workflow-run records
//! - [`JobQueue`]: queue that executes resume jobs
//! - [`KeyValueStore`]: shared key/value store holding migration markers
//!
//! [`memory`] provides in-process implementations; [`file`] provides
//! JSON-file implementations that share state through a directory.

pub mod file;
pub mod memory;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::{PausedExecution, ResumeJob, RunStatus};

pub use file::{FileJobQueue, FileKeyValueStore, FileRunStore};
pub use memory::{MemoryJobQueue, MemoryKeyValueStore, MemoryRunStore};

/// Result of handing a job to a [`JobQueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The job was accepted and will run after its delay.
    Enqueued,
    /// A job with the same id already exists; nothing was added.
    Duplicate,
}

/// Shared key/value store. Must be durable and visible to every process
/// instance that runs the migration.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Read access to workflow-run records.
#[async_trait]
pub trait RunStore: Send + Sync {
    /// Returns every run currently in `status`, or an empty list.
    async fn list_by_status(&self, status: RunStatus) -> Result<Vec<PausedExecution>, StoreError>;

    /// Resolves the platform that owns `project_id`.
    async fn get_platform_id(&self, project_id: &str) -> Result<String, StoreError>;
}

/// Queue that executes jobs after their delay.
///
/// Implementations must treat job ids as unique: submitting a job whose id
/// is already queued returns [`SubmitOutcome::Duplicate`] (or an error) and
/// never causes a second execution. The migration relies on this when two
/// instances run it concurrently.
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn submit(&self, job: ResumeJob) -> Result<SubmitOutcome, StoreError>;
}
