//! File persistence.
//!
//! One snapshot file per document, `<dir>/<document_id>.<ext>`. Writes go
//! to a temporary file first and are renamed into place, so a crash during
//! a save leaves the previous snapshot intact.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use super::snapshot::{DocumentSnapshot, SnapshotFormat};
use super::Persistence;
use crate::config::EngineConfig;
use crate::error::PersistenceError;
use crate::variable::Variable;

/// Persistence backed by a directory of snapshot files.
#[derive(Debug, Clone)]
pub struct FilePersistence {
    dir: PathBuf,
    format: SnapshotFormat,
}

impl FilePersistence {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            format: SnapshotFormat::default(),
        }
    }

    pub fn with_format(mut self, format: SnapshotFormat) -> Self {
        self.format = format;
        self
    }

    /// Store snapshots under `dir` in `config.snapshot_format`.
    pub fn from_config(dir: impl Into<PathBuf>, config: &EngineConfig) -> Self {
        Self::new(dir).with_format(config.snapshot_format)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the snapshot file for `document_id`.
    ///
    /// Ids that could escape the directory are rejected.
    pub fn path_for(&self, document_id: &str) -> Result<PathBuf, PersistenceError> {
        let unsafe_id = document_id.is_empty()
            || document_id.starts_with('.')
            || document_id.contains(['/', '\\', '\0']);
        if unsafe_id {
            return Err(PersistenceError::Io {
                path: self.dir.join(document_id),
                source: std::io::Error::new(
                    ErrorKind::InvalidInput,
                    "document id is not a valid file name",
                ),
            });
        }
        Ok(self
            .dir
            .join(format!("{document_id}.{}", self.format.extension())))
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> PersistenceError + '_ {
    move |source| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[async_trait]
impl Persistence for FilePersistence {
    async fn save(&self, document_id: &str, variables: &[Variable]) -> Result<(), PersistenceError> {
        let path = self.path_for(document_id)?;
        let bytes = DocumentSnapshot::new(document_id, variables.to_vec()).encode(self.format)?;

        fs::create_dir_all(&self.dir)
            .await
            .map_err(io_error(&self.dir))?;

        let tmp = path.with_extension(format!("{}.tmp", self.format.extension()));
        fs::write(&tmp, &bytes).await.map_err(io_error(&tmp))?;
        fs::rename(&tmp, &path).await.map_err(io_error(&path))?;

        tracing::debug!(document = document_id, path = %path.display(), "snapshot written");
        Ok(())
    }

    async fn load(&self, document_id: &str) -> Result<Vec<Variable>, PersistenceError> {
        let path = self.path_for(document_id)?;
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(PersistenceError::NotFound {
                    document_id: document_id.to_string(),
                });
            }
            Err(err) => return Err(io_error(&path)(err)),
        };
        let snapshot = DocumentSnapshot::decode(document_id, &bytes, self.format)?;
        Ok(snapshot.variables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn save_then_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = FilePersistence::new(dir.path().join("docs"));
        let variables = vec![
            Variable::new("rows").with_value(json!([1, 2])),
            Variable::new("total").with_dependencies(["rows"]).with_code("sum(rows)"),
        ];

        persistence.save("report", &variables).await.unwrap();
        assert!(dir.path().join("docs/report.json").exists());
        assert!(!dir.path().join("docs/report.json.tmp").exists());
        assert_eq!(persistence.load("report").await.unwrap(), variables);
    }

    #[tokio::test]
    async fn msgpack_files_use_their_extension() {
        let dir = tempfile::tempdir().unwrap();
        let persistence =
            FilePersistence::new(dir.path()).with_format(SnapshotFormat::MessagePack);
        persistence.save("doc", &[Variable::new("x")]).await.unwrap();

        assert!(dir.path().join("doc.msgpack").exists());
        assert_eq!(persistence.load("doc").await.unwrap(), vec![Variable::new("x")]);
    }

    #[tokio::test]
    async fn format_comes_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::from_json_str(r#"{ "snapshot_format": "msgpack" }"#).unwrap();
        let persistence = FilePersistence::from_config(dir.path(), &config);
        persistence.save("doc", &[Variable::new("x")]).await.unwrap();

        assert!(dir.path().join("doc.msgpack").exists());
        assert!(!dir.path().join("doc.json").exists());

        let default = FilePersistence::from_config(dir.path(), &EngineConfig::default());
        assert_eq!(default.path_for("doc").unwrap(), dir.path().join("doc.json"));
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = FilePersistence::new(dir.path());
        let err = persistence.load("absent").await.unwrap_err();
        assert!(matches!(err, PersistenceError::NotFound { .. }));
    }

    #[test]
    fn path_traversal_is_rejected() {
        let persistence = FilePersistence::new("/tmp/varweave");
        for id in ["", "../etc", "a/b", "a\\b", ".hidden"] {
            assert!(persistence.path_for(id).is_err(), "{id:?}");
        }
        assert!(persistence.path_for("doc-1").is_ok());
    }
}
