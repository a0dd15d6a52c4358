//! Paused-Run Migration
//!
//! One-shot startup task that moves delay-paused runs onto the job queue:
//! 1. Checks the ledger and returns early if the migration already ran
//! 2. Lists every paused run
//! 3. Skips runs that are not waiting on a timer
//! 4. Computes each run's residual delay and submits a resume job
//! 5. Writes the completion marker once every submission succeeded
//!
//! A crash mid-pass leaves the marker unset, so the next start repeats the
//! whole pass. Repeated submissions are absorbed by the queue because each
//! job id equals its run id.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use serde::Serialize;

use crate::error::MigrationError;
use crate::store::{JobQueue, KeyValueStore, RunStore, SubmitOutcome};

use super::composer::ResumeJobComposer;
use super::delay::residual_delay;
use super::ledger::{MigrationLedger, MigrationState, REFILL_PAUSED_RUNS_KEY};
use super::reader::PausedRunReader;

/// How a migration pass ended.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MigrationStatus {
    /// The marker was already set; nothing was read or submitted.
    AlreadyCompleted,
    /// Every eligible run was handled and the marker is now set.
    Completed,
    /// At least one submission failed; the marker was left unset.
    Incomplete,
    /// Jobs were composed but neither submitted nor marked.
    DryRun,
}

/// A resume job the queue refused.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionFailure {
    pub execution_id: String,
    pub error: String,
}

/// Outcome of one migration pass.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    pub status: MigrationStatus,

    /// Runs whose resume job is now queued (including duplicates)
    pub migrated_count: usize,

    /// Submissions the queue reported as already present
    pub duplicate_count: usize,

    /// Paused runs waiting on something other than a timer
    pub skipped_count: usize,

    /// Delay-paused runs missing their resume time
    pub malformed: Vec<String>,

    pub failed: Vec<SubmissionFailure>,
}

impl MigrationReport {
    fn new(status: MigrationStatus) -> Self {
        Self {
            status,
            migrated_count: 0,
            duplicate_count: 0,
            skipped_count: 0,
            malformed: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// Returns true unless a submission failed.
    pub fn is_success(&self) -> bool {
        self.status != MigrationStatus::Incomplete
    }
}

/// Migration that re-schedules delay-paused runs onto a job queue.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use resumerunner::migration::PausedRunMigration;
/// use resumerunner::store::{MemoryJobQueue, MemoryKeyValueStore, MemoryRunStore};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let migration = PausedRunMigration::new(
///         Arc::new(MemoryKeyValueStore::new()),
///         Arc::new(MemoryRunStore::new()),
///         Arc::new(MemoryJobQueue::new()),
///     );
///     let report = migration.run().await?;
///     println!("Migrated {} runs", report.migrated_count);
///     Ok(())
/// }
/// ```
pub struct PausedRunMigration {
    kv: Arc<dyn KeyValueStore>,
    ledger: MigrationLedger,
    reader: PausedRunReader,
    runs: Arc<dyn RunStore>,
    queue: Arc<dyn JobQueue>,
    composer: ResumeJobComposer,
    dry_run: bool,
}

impl PausedRunMigration {
    /// Creates the migration using the default marker key.
    pub fn new(
        kv: Arc<dyn KeyValueStore>,
        runs: Arc<dyn RunStore>,
        queue: Arc<dyn JobQueue>,
    ) -> Self {
        Self {
            ledger: MigrationLedger::new(Arc::clone(&kv), REFILL_PAUSED_RUNS_KEY),
            kv,
            reader: PausedRunReader::new(Arc::clone(&runs)),
            runs,
            queue,
            composer: ResumeJobComposer::new(),
            dry_run: false,
        }
    }

    /// Sets the key of the completion marker.
    pub fn set_marker_key(&mut self, key: impl Into<String>) {
        self.ledger = MigrationLedger::new(Arc::clone(&self.kv), key);
    }

    /// Enables or disables dry run mode.
    pub fn set_dry_run(&mut self, dry_run: bool) {
        self.dry_run = dry_run;
    }

    /// Replaces the job composer.
    pub fn set_composer(&mut self, composer: ResumeJobComposer) {
        self.composer = composer;
    }

    pub fn ledger(&self) -> &MigrationLedger {
        &self.ledger
    }

    /// Runs the migration against the current wall clock.
    pub async fn run(&self) -> Result<MigrationReport, MigrationError> {
        self.run_at(Utc::now()).await
    }

    /// Runs the migration, measuring residual delays from `now`.
    ///
    /// # Returns
    ///
    /// * `Ok(report)` - The pass finished; see [`MigrationReport::status`]
    /// * `Err` - The ledger, run store or platform lookup failed. No marker
    ///   is written, so the next start retries the whole pass.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<MigrationReport, MigrationError> {
        let key = self.ledger.key().to_string();

        if self.ledger.state().await.map_err(MigrationError::Ledger)? == MigrationState::Completed {
            info!("Migration '{}' already completed, skipping", key);
            return Ok(MigrationReport::new(MigrationStatus::AlreadyCompleted));
        }

        debug!("Migration '{}' state: {:?}", key, MigrationState::Running);
        let paused = self
            .reader
            .list_paused()
            .await
            .map_err(MigrationError::RunStore)?;
        info!("Found {} paused runs", paused.len());

        let mut report = MigrationReport::new(MigrationStatus::Completed);

        for execution in &paused {
            let Some(delayed) = execution.as_delay_paused() else {
                debug!(
                    "Skipping run '{}' ({} pause)",
                    execution.id,
                    execution
                        .pause_metadata
                        .as_ref()
                        .map(|metadata| metadata.kind())
                        .unwrap_or("no")
                );
                report.skipped_count += 1;
                continue;
            };

            let Some(resume_at) = delayed.pause().resume_date_time else {
                let err = MigrationError::MalformedPauseMetadata {
                    execution_id: execution.id.clone(),
                    reason: "delay pause has no valid resume time",
                };
                warn!("{}", err);
                report.malformed.push(execution.id.clone());
                continue;
            };

            let platform_id = self
                .runs
                .get_platform_id(&execution.project_id)
                .await
                .map_err(|source| MigrationError::PlatformLookup {
                    project_id: execution.project_id.clone(),
                    source,
                })?;

            let delay = residual_delay(resume_at, now);
            let job = self.composer.compose(delayed, &platform_id, delay);

            if self.dry_run {
                info!(
                    "[DRY RUN] Would resume run '{}' after {} ms",
                    job.id,
                    job.delay.as_millis()
                );
                report.migrated_count += 1;
                continue;
            }

            match self.queue.submit(job).await {
                Ok(SubmitOutcome::Enqueued) => {
                    debug!("Queued resume job for run '{}' ({} ms)", execution.id, delay.as_millis());
                    report.migrated_count += 1;
                }
                Ok(SubmitOutcome::Duplicate) => {
                    debug!("Resume job for run '{}' already queued", execution.id);
                    report.migrated_count += 1;
                    report.duplicate_count += 1;
                }
                Err(e) => {
                    error!("Failed to queue resume job for run '{}': {}", execution.id, e);
                    report.failed.push(SubmissionFailure {
                        execution_id: execution.id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        if self.dry_run {
            report.status = MigrationStatus::DryRun;
            info!("[DRY RUN] {} paused runs would be migrated", report.migrated_count);
            return Ok(report);
        }

        if !report.failed.is_empty() {
            report.status = MigrationStatus::Incomplete;
            warn!(
                "Migrated {} paused runs, {} failed; '{}' left unset for retry",
                report.migrated_count,
                report.failed.len(),
                key
            );
            return Ok(report);
        }

        self.ledger
            .mark_completed()
            .await
            .map_err(MigrationError::Ledger)?;
        info!("Migrated {} paused runs", report.migrated_count);

        Ok(report)
    }
}
