//! Error Types
//!
//! Errors raised by the collaborator stores, the migration pass and
//! configuration loading.

use std::path::PathBuf;

use thiserror::Error;

/// Failure talking to one of the external stores (run store, job queue,
/// key/value store).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// No platform is registered for the project.
    #[error("no platform registered for project '{0}'")]
    ProjectNotFound(String),

    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors produced by the paused-run migration.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Reading or writing the migration marker failed.
    #[error("migration ledger failed: {0}")]
    Ledger(#[source] StoreError),

    /// Listing paused runs failed.
    #[error("failed to list paused runs: {0}")]
    RunStore(#[source] StoreError),

    /// Resolving the platform of a project failed.
    #[error("failed to resolve platform for project '{project_id}': {source}")]
    PlatformLookup {
        project_id: String,
        #[source]
        source: StoreError,
    },

    /// A delay-paused run is missing the data needed to reschedule it.
    #[error("run '{execution_id}' has malformed pause metadata: {reason}")]
    MalformedPauseMetadata {
        execution_id: String,
        reason: &'static str,
    },
}

/// Errors raised while loading the migration configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
