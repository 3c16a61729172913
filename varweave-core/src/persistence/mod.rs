//! Persistence
//!
//! The engine saves the whole variable list after every committed change
//! and loads it back when a document is opened. Failures to save are logged
//! by the engine and never roll back in-memory state; the next successful
//! save wins.
//!
//! Two backends are provided:
//!
//! - `MemoryPersistence`: encoded snapshots in a concurrent map
//! - `FilePersistence`: one file per document in a directory
//!
//! Both store a `DocumentSnapshot` encoded as JSON or MessagePack.

mod file;
mod memory;
mod snapshot;

use async_trait::async_trait;

use crate::error::PersistenceError;
use crate::variable::Variable;

pub use file::FilePersistence;
pub use memory::MemoryPersistence;
pub use snapshot::{DocumentSnapshot, SnapshotFormat};

/// Stores and retrieves a document's variables.
#[async_trait]
pub trait Persistence: Send + Sync {
    /// Replace the stored variables of `document_id`.
    async fn save(&self, document_id: &str, variables: &[Variable]) -> Result<(), PersistenceError>;

    /// Fetch the stored variables of `document_id`, in saved order.
    async fn load(&self, document_id: &str) -> Result<Vec<Variable>, PersistenceError>;
}
