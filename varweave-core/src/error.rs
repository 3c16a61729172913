//! Error Types
//!
//! Structural errors (bad names, unknown variables, cycles) are detected
//! before anything is committed, so they never leave the graph in a
//! half-edited state. Runtime errors (executor and persistence failures)
//! are contained where they happen: the engine logs them and keeps going.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, VarError>;

/// The main error type for variable and graph operations.
#[derive(Error, Debug)]
pub enum VarError {
    /// The name is not a legal identifier.
    #[error("invalid variable name {name:?}: {reason}")]
    InvalidName {
        /// The rejected name.
        name: String,
        /// Which rule the name broke.
        reason: &'static str,
    },

    /// The name does not refer to a variable in the store.
    #[error("unknown variable `{name}`")]
    UnknownVariable {
        /// The missing name.
        name: String,
    },

    /// A variable with this name already exists.
    #[error("variable `{name}` already exists")]
    DuplicateVariable {
        /// The clashing name.
        name: String,
    },

    /// A dependency edit was rejected because it would close a cycle.
    #[error("dependency change for `{name}` rejected: cycle {}", .path.join(" -> "))]
    Cycle {
        /// The variable whose dependency list was being edited.
        name: String,
        /// The cycle, first and last element equal.
        path: Vec<String>,
    },

    /// The variable cannot be removed while other variables depend on it.
    #[error("variable `{name}` is still referenced by {}", .dependents.join(", "))]
    StillReferenced {
        /// The variable that was asked to be removed.
        name: String,
        /// Variables whose dependency lists still mention it.
        dependents: Vec<String>,
    },

    /// A single variable's computation failed.
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// Saving or loading failed.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// Configuration could not be read.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Failure reported by the executor for one variable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("execution of `{variable}` failed: {message}")]
pub struct ExecutionError {
    /// The variable whose code failed.
    pub variable: String,
    /// Executor-provided description of the failure.
    pub message: String,
}

impl ExecutionError {
    /// Create a new execution error.
    pub fn new(variable: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
            message: message.into(),
        }
    }
}

/// Failure of the persistence collaborator.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Filesystem access failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path being read or written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The snapshot could not be encoded.
    #[error("failed to encode snapshot for document `{document_id}`: {cause}")]
    Encode {
        /// Document being saved.
        document_id: String,
        /// Codec error message.
        cause: String,
    },

    /// The stored bytes could not be decoded.
    #[error("failed to decode snapshot for document `{document_id}`: {cause}")]
    Decode {
        /// Document being loaded.
        document_id: String,
        /// Codec error message.
        cause: String,
    },

    /// Nothing has been saved under this document id.
    #[error("no snapshot stored for document `{document_id}`")]
    NotFound {
        /// The requested document.
        document_id: String,
    },

    /// The snapshot decoded but violates a graph invariant.
    #[error("snapshot for document `{document_id}` is corrupt: {cause}")]
    CorruptSnapshot {
        /// Document being loaded.
        document_id: String,
        /// The violated invariant.
        cause: String,
    },
}

/// Failure to read an engine configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Config file path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid configuration JSON.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}
