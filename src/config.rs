//! Migration Configuration
//!
//! Settings are read from an optional YAML file; every field has a default.
//!
//! # Example YAML Format
//!
//! ```yaml
//! markerKey: refill_paused_runs
//! stateDir: /var/lib/resumerunner
//! dryRun: false
//! schemaVersion: 4
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::migration::REFILL_PAUSED_RUNS_KEY;
use crate::model::LATEST_JOB_DATA_SCHEMA_VERSION;

/// Default directory for the file-backed stores: `$HOME/.resumerunner/state`.
pub static DEFAULT_STATE_DIR: Lazy<PathBuf> = Lazy::new(|| {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());

    PathBuf::from(home).join(".resumerunner").join("state")
});

/// Settings for one migration pass.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct MigrationConfig {
    /// Key of the completion marker in the shared key/value store
    pub marker_key: String,

    /// Directory holding `kv.json`, `runs.json` and `jobs.json`
    pub state_dir: PathBuf,

    /// Compose jobs without submitting them or writing the marker
    pub dry_run: bool,

    /// Job-data schema version stamped on resume jobs
    pub schema_version: u32,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            marker_key: REFILL_PAUSED_RUNS_KEY.to_string(),
            state_dir: DEFAULT_STATE_DIR.clone(),
            dry_run: false,
            schema_version: LATEST_JOB_DATA_SCHEMA_VERSION,
        }
    }
}

impl MigrationConfig {
    /// Checks that the settings can drive a migration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.marker_key.trim().is_empty() {
            return Err(ConfigError::Invalid("markerKey must not be empty".to_string()));
        }
        if self.schema_version == 0 || self.schema_version > LATEST_JOB_DATA_SCHEMA_VERSION {
            return Err(ConfigError::Invalid(format!(
                "schemaVersion must be between 1 and {}, got {}",
                LATEST_JOB_DATA_SCHEMA_VERSION, self.schema_version
            )));
        }
        Ok(())
    }
}

/// Loads and validates a configuration file.
pub fn load_config(path: impl AsRef<Path>) -> Result<MigrationConfig, ConfigError> {
    let path = path.as_ref();
    info!("Loading config from: {}", path.display());

    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Config content loaded ({} bytes)", content.len());

    let config = parse_config(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate()?;

    Ok(config)
}

/// Parses YAML; an empty document yields the defaults.
fn parse_config(content: &str) -> Result<MigrationConfig, serde_yaml::Error> {
    if content.trim().is_empty() {
        return Ok(MigrationConfig::default());
    }
    serde_yaml::from_str(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = MigrationConfig::default();
        assert_eq!(config.marker_key, "refill_paused_runs");
        assert_eq!(config.schema_version, LATEST_JOB_DATA_SCHEMA_VERSION);
        assert!(!config.dry_run);
        assert!(config.state_dir.ends_with(".resumerunner/state"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = parse_config("dryRun: true\nstateDir: /tmp/rr\n").unwrap();
        assert!(config.dry_run);
        assert_eq!(config.state_dir, PathBuf::from("/tmp/rr"));
        assert_eq!(config.marker_key, REFILL_PAUSED_RUNS_KEY);
    }

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(parse_config("  \n").unwrap(), MigrationConfig::default());
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "markerKey: refill_v2\nschemaVersion: 3\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.marker_key, "refill_v2");
        assert_eq!(config.schema_version, 3);
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("/nonexistent/resumerunner.yaml");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_load_config_bad_yaml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "dryRun: [not, a, bool]\n").unwrap();

        assert!(matches!(load_config(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = MigrationConfig::default();
        config.marker_key = " ".to_string();
        assert!(config.validate().is_err());

        let mut config = MigrationConfig::default();
        config.schema_version = 0;
        assert!(config.validate().is_err());

        config.schema_version = LATEST_JOB_DATA_SCHEMA_VERSION + 1;
        assert!(config.validate().is_err());
    }
}
