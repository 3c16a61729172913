//! Varweave Core
//!
//! This crate provides the dependency graph and propagation engine behind
//! template variables: named values that may be derived from other
//! variables. It implements:
//!
//! - Edit-time cycle detection for dependency changes
//! - Deterministic topological ordering of variables
//! - Change propagation that recomputes each downstream variable at most
//!   once per change, in dependency order
//! - Pluggable executor, persistence and observer collaborators
//!
//! The crate can be used as a native Rust library and, with the `python`
//! feature, as a Python extension module via PyO3.
//!
//! # Architecture
//!
//! - `variable`: variable records and the ordered `VariableStore`
//! - `graph`: pure queries over the store's dependency edges
//! - `propagation`: the engine and its collaborator contracts
//! - `persistence`: snapshot storage backends
//! - `document`: a store plus engine behind a single-writer lock
//!
//! # Example
//!
//! ```rust,ignore
//! use varweave_core::{Document, FnExecutor, Variable};
//!
//! let executor = Arc::new(FnExecutor::new(|req| {
//!     let a = req.value("a").and_then(Value::as_i64).unwrap_or(0);
//!     Ok(json!(a * 2))
//! }));
//! let doc = Document::new("report", executor);
//!
//! doc.add_variable(Variable::new("a")).await?;
//! doc.add_variable(Variable::new("b").with_dependencies(["a"]).with_code("a * 2")).await?;
//!
//! doc.set_value("a", json!(5)).await?;
//! assert_eq!(doc.value("b").await, Some(json!(10)));
//! ```

pub mod config;
pub mod document;
pub mod error;
pub mod graph;
pub mod persistence;
pub mod propagation;
pub mod variable;

#[cfg(feature = "python")]
mod python;

pub use config::EngineConfig;
pub use document::Document;
pub use error::{ConfigError, ExecutionError, PersistenceError, Result, VarError};
pub use graph::DependencyGraph;
pub use persistence::{
    DocumentSnapshot, FilePersistence, MemoryPersistence, Persistence, SnapshotFormat,
};
pub use propagation::{
    CallbackObserver, DependencyValue, ExecutionRequest, Executor, FnExecutor, Notification,
    Observer, ObserverId, ObserverSet, PropagationEngine, PropagationReport, PropagationStep,
    SkipReason, StepOutcome,
};
pub use variable::{validate_name, Variable, VariableStore};
