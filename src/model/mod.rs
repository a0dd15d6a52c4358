//! Run and Job Data Model
//!
//! - [`execution`]: Paused workflow runs as read from the run store
//! - [`job`]: Resume jobs submitted to the job queue

pub mod execution;
pub mod job;

pub use execution::{
    DelayPause, DelayPausedRun, PauseMetadata, PausedExecution, ProgressUpdateType,
    RunEnvironment, RunStatus, WebhookPause,
};
pub use job::{
    ExecutionMode, JobKind, ResumeJob, ResumeJobPayload, WorkerJobKind,
    LATEST_JOB_DATA_SCHEMA_VERSION,
};
