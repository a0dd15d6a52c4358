//! Paused Execution Model
//!
//! Read-only view of a workflow run as stored by the run store.
//!
//! # Example JSON
//!
//! ```json
//! {
//!   "id": "run-42",
//!   "status": "PAUSED",
//!   "projectId": "proj-1",
//!   "environment": "PRODUCTION",
//!   "flowVersionId": "fv-7",
//!   "pauseMetadata": {
//!     "type": "DELAY",
//!     "resumeDateTime": "2026-10-18T12:00:00Z",
//!     "handlerId": "handler-a",
//!     "progressUpdateType": "WEBHOOK_RESPONSE"
//!   }
//! }
//! ```

use chrono::{DateTime, Utc};
use log::warn;
use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle status of a workflow run.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Queued,
    Running,
    Paused,
    Succeeded,
    Failed,
    Timeout,
    Stopped,
    InternalError,
}

/// Deployment environment a run belongs to.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunEnvironment {
    Production,
    Testing,
}

/// How progress of a resumed run is reported back to its caller.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProgressUpdateType {
    #[default]
    None,
    WebhookResponse,
    TestFlow,
}

/// Pause that resumes on a timer.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DelayPause {
    /// When the run should continue. Always set on healthy records; an
    /// unparseable value reads as `None`.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub resume_date_time: Option<DateTime<Utc>>,

    /// Worker handler waiting synchronously on the run, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handler_id: Option<String>,

    /// Inbound HTTP request awaiting the run's response, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id_to_reply: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_update_type: Option<ProgressUpdateType>,
}

/// Reads an RFC 3339 timestamp, mapping null or garbage to `None` so a
/// single bad record is reported per run instead of failing the whole read.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => match DateTime::parse_from_rfc3339(&s) {
            Ok(timestamp) => Ok(Some(timestamp.with_timezone(&Utc))),
            Err(e) => {
                warn!("Ignoring unparseable resume time '{}': {}", s, e);
                Ok(None)
            }
        },
        Some(other) => {
            warn!("Ignoring non-string resume time: {}", other);
            Ok(None)
        }
    }
}

/// Pause that resumes when an external request arrives.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPause {
    pub request_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id_to_reply: Option<String>,

    /// Response returned to the caller while the run stays paused
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handler_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_update_type: Option<ProgressUpdateType>,
}

/// Why a run is paused and what resumes it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PauseMetadata {
    Delay(DelayPause),
    Webhook(WebhookPause),
}

impl PauseMetadata {
    /// Returns the delay pause, or `None` for any other variant.
    pub fn as_delay(&self) -> Option<&DelayPause> {
        match self {
            PauseMetadata::Delay(pause) => Some(pause),
            PauseMetadata::Webhook(_) => None,
        }
    }

    /// Short name of the variant, used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            PauseMetadata::Delay(_) => "DELAY",
            PauseMetadata::Webhook(_) => "WEBHOOK",
        }
    }
}

/// A workflow run as seen by the migration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PausedExecution {
    pub id: String,
    pub status: RunStatus,
    pub project_id: String,
    pub environment: RunEnvironment,
    pub flow_version_id: String,

    /// Missing only on corrupt records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pause_metadata: Option<PauseMetadata>,
}

impl PausedExecution {
    /// Creates a paused production run with no pause metadata.
    pub fn new(
        id: impl Into<String>,
        project_id: impl Into<String>,
        flow_version_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            status: RunStatus::Paused,
            project_id: project_id.into(),
            environment: RunEnvironment::Production,
            flow_version_id: flow_version_id.into(),
            pause_metadata: None,
        }
    }

    /// Sets the pause metadata.
    pub fn with_pause(mut self, pause: PauseMetadata) -> Self {
        self.pause_metadata = Some(pause);
        self
    }

    /// Sets the environment.
    pub fn with_environment(mut self, environment: RunEnvironment) -> Self {
        self.environment = environment;
        self
    }

    /// Sets the run status.
    pub fn with_status(mut self, status: RunStatus) -> Self {
        self.status = status;
        self
    }

    /// Returns the delay pause if this run is waiting on a timer.
    pub fn delay_pause(&self) -> Option<&DelayPause> {
        self.pause_metadata.as_ref().and_then(PauseMetadata::as_delay)
    }

    /// Pairs the run with its own delay pause, if it is waiting on a timer.
    pub fn as_delay_paused(&self) -> Option<DelayPausedRun<'_>> {
        self.delay_pause().map(|pause| DelayPausedRun {
            execution: self,
            pause,
        })
    }
}

/// A run waiting on a timer together with that run's delay pause.
///
/// Only built by [`PausedExecution::as_delay_paused`], so the pause always
/// belongs to the execution.
#[derive(Debug, Clone, Copy)]
pub struct DelayPausedRun<'a> {
    execution: &'a PausedExecution,
    pause: &'a DelayPause,
}

impl<'a> DelayPausedRun<'a> {
    pub fn execution(&self) -> &'a PausedExecution {
        self.execution
    }

    pub fn pause(&self) -> &'a DelayPause {
        self.pause
    }
}

impl DelayPause {
    /// Creates a delay pause resuming at `resume_at`.
    pub fn until(resume_at: DateTime<Utc>) -> Self {
        Self {
            resume_date_time: Some(resume_at),
            handler_id: None,
            request_id_to_reply: None,
            progress_update_type: None,
        }
    }
}
