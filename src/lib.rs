//! ResumeRunner - Paused Run Migration
//!
//! Moves workflow runs that are paused on a timer onto a job queue, once,
//! when the resume-scheduling backend changes. Each run gets a one-time
//! resume job carrying its full context and the time left on its wait.
//!
//! # Architecture
//!
//! The library is organized into four main modules:
//!
//! - [`model`]: Paused runs and resume jobs
//! - [`store`]: Interfaces to the run store, job queue and key/value store
//! - [`migration`]: Ledger, delay calculation, job composition and the pass
//! - [`config`]: YAML configuration for the command-line host
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use resumerunner::migration::PausedRunMigration;
//! use resumerunner::store::{FileJobQueue, FileKeyValueStore, FileRunStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let state_dir = "/var/lib/resumerunner";
//!     let migration = PausedRunMigration::new(
//!         Arc::new(FileKeyValueStore::new(state_dir)),
//!         Arc::new(FileRunStore::new(state_dir)),
//!         Arc::new(FileJobQueue::new(state_dir)),
//!     );
//!
//!     let report = migration.run().await?;
//!     println!("Migrated {} paused runs", report.migrated_count);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod migration;
pub mod model;
pub mod store;

// Re-export commonly used types
pub use config::{load_config, MigrationConfig};
pub use error::{ConfigError, MigrationError, StoreError};
pub use migration::{MigrationReport, MigrationStatus, PausedRunMigration};
pub use model::{PausedExecution, ResumeJob};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "ResumeRunner";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_version() {
        assert!(!VERSION.is_empty());
        assert!(VERSION.contains('.'));
    }

    #[test]
    fn test_app_name() {
        assert_eq!(APP_NAME, "ResumeRunner");
    }

    #[test]
    fn test_module_exports_execution() {
        let run = PausedExecution::new("run-1", "proj-1", "fv-1");
        assert_eq!(run.id, "run-1");
        assert!(run.delay_pause().is_none());
    }

    #[test]
    fn test_module_exports_config() {
        let config = MigrationConfig::default();
        assert_eq!(config.marker_key, migration::REFILL_PAUSED_RUNS_KEY);
    }
}
