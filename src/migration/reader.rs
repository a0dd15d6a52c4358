//! Paused-Run Reader

use std::sync::Arc;

use log::{debug, warn};

use crate::error::StoreError;
use crate::model::{PausedExecution, RunStatus};
use crate::store::RunStore;

/// Lists the runs currently paused in the run store.
#[derive(Clone)]
pub struct PausedRunReader {
    runs: Arc<dyn RunStore>,
}

impl PausedRunReader {
    pub fn new(runs: Arc<dyn RunStore>) -> Self {
        Self { runs }
    }

    /// Returns every paused run in a single read.
    ///
    /// An empty store yields an empty list. Records the store returns with
    /// a different status are dropped.
    pub async fn list_paused(&self) -> Result<Vec<PausedExecution>, StoreError> {
        let runs = self.runs.list_by_status(RunStatus::Paused).await?;
        let total = runs.len();

        let paused: Vec<PausedExecution> = runs
            .into_iter()
            .filter(|run| {
                if run.status != RunStatus::Paused {
                    warn!("Run '{}' listed as paused but has status {:?}", run.id, run.status);
                    return false;
                }
                true
            })
            .collect();

        debug!("Read {} paused runs ({} listed)", paused.len(), total);
        Ok(paused)
    }
}
