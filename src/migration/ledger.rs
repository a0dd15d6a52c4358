//! Migration Ledger
//!
//! Records in the shared key/value store that a one-time migration has
//! finished. The marker is written once and never removed.

use std::sync::Arc;

use log::debug;

use crate::error::StoreError;
use crate::store::KeyValueStore;

/// Key of the paused-run refill marker.
pub const REFILL_PAUSED_RUNS_KEY: &str = "refill_paused_runs";

const COMPLETED_VALUE: &str = "true";

/// Progress of a one-time migration.
///
/// Only `Completed` is ever persisted; `Running` lives for the duration of
/// a single pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationState {
    NotStarted,
    Running,
    Completed,
}

/// Idempotency marker for one named migration.
#[derive(Clone)]
pub struct MigrationLedger {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl MigrationLedger {
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Key under which the marker is stored.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns true once the marker has been written.
    ///
    /// Any stored value counts, whatever its content.
    pub async fn exists(&self) -> Result<bool, StoreError> {
        Ok(self.store.get(&self.key).await?.is_some())
    }

    /// Reads the persisted state: `Completed` or `NotStarted`.
    pub async fn state(&self) -> Result<MigrationState, StoreError> {
        let state = if self.exists().await? {
            MigrationState::Completed
        } else {
            MigrationState::NotStarted
        };
        debug!("Migration '{}' state: {:?}", self.key, state);
        Ok(state)
    }

    /// Writes the completion marker.
    pub async fn mark_completed(&self) -> Result<(), StoreError> {
        self.store.set(&self.key, COMPLETED_VALUE).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryKeyValueStore;

    #[tokio::test]
    async fn test_ledger_starts_not_started() {
        let ledger = MigrationLedger::new(Arc::new(MemoryKeyValueStore::new()), REFILL_PAUSED_RUNS_KEY);
        assert_eq!(ledger.state().await.unwrap(), MigrationState::NotStarted);
        assert!(!ledger.exists().await.unwrap());
    }

    #[tokio::test]
    async fn test_mark_completed_persists_marker() {
        let store = MemoryKeyValueStore::new();
        let ledger = MigrationLedger::new(Arc::new(store.clone()), REFILL_PAUSED_RUNS_KEY);

        ledger.mark_completed().await.unwrap();

        assert_eq!(ledger.state().await.unwrap(), MigrationState::Completed);
        assert_eq!(
            store.get(REFILL_PAUSED_RUNS_KEY).await.unwrap().as_deref(),
            Some("true")
        );
    }

    #[tokio::test]
    async fn test_any_value_counts_as_completed() {
        let store = MemoryKeyValueStore::new();
        store.set("custom_key", "1").await.unwrap();

        let ledger = MigrationLedger::new(Arc::new(store), "custom_key");
        assert_eq!(ledger.key(), "custom_key");
        assert_eq!(ledger.state().await.unwrap(), MigrationState::Completed);
    }
}
