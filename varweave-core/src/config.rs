//! Engine configuration.
//!
//! Every field has a default, so an empty JSON object is a valid config:
//!
//! ```json
//! {
//!     "data_source": "s3://bucket/sales.csv",
//!     "persist_on_change": true,
//!     "prune_unchanged": false,
//!     "snapshot_format": "msgpack"
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::persistence::SnapshotFormat;

/// Settings for a document's propagation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Data source reference passed to the executor with every request.
    pub data_source: Option<String>,

    /// Save the store after every committed value or structural change.
    pub persist_on_change: bool,

    /// Skip dependents none of whose dependencies changed during a chain.
    ///
    /// Off by default, so every dependent with all of its inputs present is
    /// recomputed once per chain. A dependent that has no value yet is never
    /// skipped.
    pub prune_unchanged: bool,

    /// Encoding used by backends built with `FilePersistence::from_config`
    /// or `MemoryPersistence::from_config`.
    pub snapshot_format: SnapshotFormat,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_source: None,
            persist_on_change: true,
            prune_unchanged: false,
            snapshot_format: SnapshotFormat::Json,
        }
    }
}

impl EngineConfig {
    /// Parse a config from JSON.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON config file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    pub fn with_data_source(mut self, data_source: impl Into<String>) -> Self {
        self.data_source = Some(data_source.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_uses_defaults() {
        let config = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert!(config.persist_on_change);
        assert!(!config.prune_unchanged);
    }

    #[test]
    fn parses_all_fields() {
        let config = EngineConfig::from_json_str(
            r#"{
                "data_source": "sales.csv",
                "persist_on_change": false,
                "prune_unchanged": true,
                "snapshot_format": "msgpack"
            }"#,
        )
        .unwrap();
        assert_eq!(config.data_source.as_deref(), Some("sales.csv"));
        assert!(!config.persist_on_change);
        assert!(config.prune_unchanged);
        assert_eq!(config.snapshot_format, SnapshotFormat::MessagePack);
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            EngineConfig::from_json_str("{ nope"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn reads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        std::fs::write(&path, r#"{ "data_source": "db://orders" }"#).unwrap();

        let config = EngineConfig::from_path(&path).unwrap();
        assert_eq!(config.data_source.as_deref(), Some("db://orders"));

        let missing = EngineConfig::from_path(dir.path().join("missing.json"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }
}
