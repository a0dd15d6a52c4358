//! Paused-Run Migration Module
//!
//! Re-schedules delay-paused workflow runs onto the job queue, exactly once
//! per deployment.
//!
//! # Architecture
//!
//! - [`ledger`]: Completion marker in the shared key/value store
//! - [`reader`]: Lists paused runs from the run store
//! - [`delay`]: Residual wait until a run's resume time
//! - [`composer`]: Builds the resume job for a paused run
//! - [`orchestrator`]: The migration pass tying the pieces together

pub mod composer;
pub mod delay;
pub mod ledger;
pub mod orchestrator;
pub mod reader;

pub use composer::ResumeJobComposer;
pub use delay::residual_delay;
pub use ledger::{MigrationLedger, MigrationState, REFILL_PAUSED_RUNS_KEY};
pub use orchestrator::{MigrationReport, MigrationStatus, PausedRunMigration, SubmissionFailure};
pub use reader::PausedRunReader;
