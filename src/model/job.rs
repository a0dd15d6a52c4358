//! Resume Job Model
//!
//! Job descriptors handed to the job queue. A job is owned by the queue
//! once submitted and is never mutated afterwards.

use std::time::Duration;

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::execution::{ProgressUpdateType, RunEnvironment};

/// Latest job-data schema understood by the execution engine.
pub const LATEST_JOB_DATA_SCHEMA_VERSION: u32 = 4;

/// Scheduling kind of a queued job.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobKind {
    OneTime,
    Repeating,
}

/// Work a worker performs for a job.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerJobKind {
    ExecuteFlow,
}

/// Whether a flow execution starts fresh or continues a paused run.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionMode {
    BeginFlow,
    Resume,
}

/// Everything a worker needs to continue a paused run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResumeJobPayload {
    pub project_id: String,
    pub platform_id: String,
    pub environment: RunEnvironment,
    pub schema_version: u32,
    pub flow_version_id: String,
    pub execution_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inbound_request_id: Option<String>,

    /// `None` means nobody waits synchronously on the resumed run
    #[serde(default)]
    pub synchronous_handler_id: Option<String>,

    pub progress_update_type: ProgressUpdateType,
    pub job_kind: WorkerJobKind,
    pub mode: ExecutionMode,
    pub body: Value,
}

/// A one-time job that resumes a paused run after `delay`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResumeJob {
    /// Equal to the paused run's id, so a run maps to at most one job
    pub id: String,

    pub kind: JobKind,

    #[serde(rename = "delayMs", with = "duration_millis")]
    pub delay: Duration,

    pub payload: ResumeJobPayload,
}

/// Serializes a `Duration` as whole milliseconds.
mod duration_millis {
    use super::*;

    pub fn serialize<S>(delay: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
