//! Resume Job Composition
//!
//! Turns a delay-paused run into the job that will continue it. Composition
//! is a pure transformation; submitting the job is the caller's concern.

use std::time::Duration;

use serde_json::json;

use crate::model::{
    DelayPausedRun, ExecutionMode, JobKind, ResumeJob, ResumeJobPayload, WorkerJobKind,
    LATEST_JOB_DATA_SCHEMA_VERSION,
};

/// Builds resume jobs stamped with a fixed job-data schema version.
#[derive(Debug, Clone, Copy)]
pub struct ResumeJobComposer {
    schema_version: u32,
}

impl Default for ResumeJobComposer {
    fn default() -> Self {
        Self::new()
    }
}

impl ResumeJobComposer {
    /// Creates a composer targeting the latest job-data schema.
    pub fn new() -> Self {
        Self {
            schema_version: LATEST_JOB_DATA_SCHEMA_VERSION,
        }
    }

    /// Creates a composer targeting a specific schema version.
    pub fn with_schema_version(schema_version: u32) -> Self {
        Self { schema_version }
    }

    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    /// Composes the resume job for a delay-paused run.
    ///
    /// The job id equals the run id. The schema version is the composer's,
    /// not the one in force when the run was paused, because the current
    /// engine interprets the job.
    pub fn compose(&self, run: DelayPausedRun<'_>, platform_id: &str, delay: Duration) -> ResumeJob {
        let execution = run.execution();
        let pause = run.pause();

        ResumeJob {
            id: execution.id.clone(),
            kind: JobKind::OneTime,
            delay,
            payload: ResumeJobPayload {
                project_id: execution.project_id.clone(),
                platform_id: platform_id.to_string(),
                environment: execution.environment,
                schema_version: self.schema_version,
                flow_version_id: execution.flow_version_id.clone(),
                execution_id: execution.id.clone(),
                inbound_request_id: pause.request_id_to_reply.clone(),
                synchronous_handler_id: pause.handler_id.clone(),
                progress_update_type: pause.progress_update_type.unwrap_or_default(),
                job_kind: WorkerJobKind::ExecuteFlow,
                mode: ExecutionMode::Resume,
                body: json!({}),
            },
        }
    }
}
