//! In-memory persistence.
//!
//! Snapshots are stored encoded, exactly as a file backend would write
//! them, so codec problems surface in tests too.

use async_trait::async_trait;
use dashmap::DashMap;

use super::snapshot::{DocumentSnapshot, SnapshotFormat};
use super::Persistence;
use crate::config::EngineConfig;
use crate::error::PersistenceError;
use crate::variable::Variable;

/// Persistence backed by a concurrent map of encoded snapshots.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    format: SnapshotFormat,
    documents: DashMap<String, Vec<u8>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_format(format: SnapshotFormat) -> Self {
        Self {
            format,
            documents: DashMap::new(),
        }
    }

    /// Encode snapshots with `config.snapshot_format`.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::with_format(config.snapshot_format)
    }

    pub fn contains(&self, document_id: &str) -> bool {
        self.documents.contains_key(document_id)
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Drop a stored document. Returns true if it existed.
    pub fn remove(&self, document_id: &str) -> bool {
        self.documents.remove(document_id).is_some()
    }

    /// Overwrite the raw bytes stored for a document.
    pub fn insert_raw(&self, document_id: impl Into<String>, bytes: Vec<u8>) {
        self.documents.insert(document_id.into(), bytes);
    }
}

#[async_trait]
impl Persistence for MemoryPersistence {
    async fn save(&self, document_id: &str, variables: &[Variable]) -> Result<(), PersistenceError> {
        let bytes = DocumentSnapshot::new(document_id, variables.to_vec()).encode(self.format)?;
        self.documents.insert(document_id.to_string(), bytes);
        Ok(())
    }

    async fn load(&self, document_id: &str) -> Result<Vec<Variable>, PersistenceError> {
        // Clone out so the shard lock is not held while decoding.
        let bytes = self
            .documents
            .get(document_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| PersistenceError::NotFound {
                document_id: document_id.to_string(),
            })?;
        let snapshot = DocumentSnapshot::decode(document_id, &bytes, self.format)?;
        Ok(snapshot.variables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn save_then_load() {
        let persistence = MemoryPersistence::with_format(SnapshotFormat::MessagePack);
        let variables = vec![
            Variable::new("a").with_value(json!(1)),
            Variable::new("b").with_dependencies(["a"]).with_code("a * 2"),
        ];

        persistence.save("doc", &variables).await.unwrap();
        assert!(persistence.contains("doc"));
        assert_eq!(persistence.load("doc").await.unwrap(), variables);
    }

    #[tokio::test]
    async fn later_save_wins() {
        let persistence = MemoryPersistence::new();
        persistence.save("doc", &[Variable::new("a")]).await.unwrap();
        persistence.save("doc", &[Variable::new("b")]).await.unwrap();

        let loaded = persistence.load("doc").await.unwrap();
        assert_eq!(loaded, vec![Variable::new("b")]);
        assert_eq!(persistence.len(), 1);
    }

    #[tokio::test]
    async fn config_picks_the_encoding() {
        let config = EngineConfig {
            snapshot_format: SnapshotFormat::MessagePack,
            ..EngineConfig::default()
        };
        let persistence = MemoryPersistence::from_config(&config);
        persistence.save("doc", &[Variable::new("a")]).await.unwrap();

        // MessagePack bytes are not JSON
        let raw = persistence.documents.get("doc").unwrap().clone();
        assert!(serde_json::from_slice::<serde_json::Value>(&raw).is_err());
        assert_eq!(persistence.load("doc").await.unwrap(), vec![Variable::new("a")]);
    }

    #[tokio::test]
    async fn missing_document() {
        let persistence = MemoryPersistence::new();
        let err = persistence.load("nope").await.unwrap_err();
        assert!(matches!(err, PersistenceError::NotFound { .. }));
        assert!(!persistence.remove("nope"));
    }
}
