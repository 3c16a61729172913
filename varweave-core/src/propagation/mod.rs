//! Propagation
//!
//! This module drives recomputation when a value changes. It owns no graph
//! state of its own: every call receives the `VariableStore` it operates on.
//!
//! # Concepts
//!
//! ## Commit
//!
//! `commit_value` is the pure state update. It compares the new value with
//! the stored one by value equality and does nothing when they are equal.
//! Otherwise it stores the value, stamps `last_updated`, persists, and
//! queues an observer notification.
//!
//! ## Propagate
//!
//! `propagate` collects the transitive dependents of the changed variable,
//! orders them by the global topological order, and recomputes each one
//! through the `Executor`, committing results with `commit_value`. The order
//! is a finite snapshot taken up front, so a chain makes at most one
//! executor call per affected variable.
//!
//! ## Collaborators
//!
//! - `Executor`: computes a value from code and dependency values
//! - `Observer`: advisory notifications for UI layers
//! - `Persistence`: saves the store after every committed change

mod engine;
mod executor;
mod observer;
mod report;

pub use engine::PropagationEngine;
pub use executor::{DependencyValue, ExecutionRequest, Executor, FnExecutor};
pub use observer::{CallbackObserver, Notification, Observer, ObserverId, ObserverSet};
pub use report::{PropagationReport, PropagationStep, SkipReason, StepOutcome};
