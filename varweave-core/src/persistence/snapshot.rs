//! Snapshot encoding.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PersistenceError;
use crate::variable::Variable;

/// Wire format of a stored snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotFormat {
    #[default]
    Json,
    #[serde(rename = "msgpack")]
    MessagePack,
}

impl SnapshotFormat {
    /// File extension used by `FilePersistence`.
    pub fn extension(self) -> &'static str {
        match self {
            SnapshotFormat::Json => "json",
            SnapshotFormat::MessagePack => "msgpack",
        }
    }
}

/// Everything stored for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSnapshot {
    pub document_id: String,
    pub saved_at: DateTime<Utc>,
    pub variables: Vec<Variable>,
}

impl DocumentSnapshot {
    pub fn new(document_id: impl Into<String>, variables: Vec<Variable>) -> Self {
        Self {
            document_id: document_id.into(),
            saved_at: Utc::now(),
            variables,
        }
    }

    pub fn encode(&self, format: SnapshotFormat) -> Result<Vec<u8>, PersistenceError> {
        let encoded = match format {
            SnapshotFormat::Json => serde_json::to_vec_pretty(self).map_err(|e| e.to_string()),
            // Named fields, since variables skip absent optional fields.
            SnapshotFormat::MessagePack => rmp_serde::to_vec_named(self).map_err(|e| e.to_string()),
        };
        encoded.map_err(|cause| PersistenceError::Encode {
            document_id: self.document_id.clone(),
            cause,
        })
    }

    pub fn decode(
        document_id: &str,
        bytes: &[u8],
        format: SnapshotFormat,
    ) -> Result<Self, PersistenceError> {
        let decoded = match format {
            SnapshotFormat::Json => {
                serde_json::from_slice::<Self>(bytes).map_err(|e| e.to_string())
            }
            SnapshotFormat::MessagePack => {
                rmp_serde::from_slice::<Self>(bytes).map_err(|e| e.to_string())
            }
        };
        let snapshot = decoded.map_err(|cause| PersistenceError::Decode {
            document_id: document_id.to_string(),
            cause,
        })?;

        if snapshot.document_id != document_id {
            return Err(PersistenceError::CorruptSnapshot {
                document_id: document_id.to_string(),
                cause: format!("snapshot belongs to document `{}`", snapshot.document_id),
            });
        }
        Ok(snapshot)
    }
}
