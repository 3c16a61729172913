//! Executor contract.
//!
//! The executor is the sandboxed runtime that turns a variable's code and
//! the values of its dependencies into a new value. The engine only knows
//! this interface.

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::error::ExecutionError;

/// One dependency handed to the executor, with its metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DependencyValue {
    /// The dependency's current value.
    pub value: Value,
    /// Its declared type, sent as `type`.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    /// Author-facing description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Display format hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// Everything the executor needs to compute one variable.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
    /// The variable being computed.
    pub variable: String,
    /// Its code.
    pub code: String,
    /// Current values of its dependencies, in declaration order.
    pub dependencies: IndexMap<String, DependencyValue>,
    /// Opaque reference to the document's data source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_source: Option<String>,
}

impl ExecutionRequest {
    /// Value of dependency `name`, if it was provided.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.dependencies.get(name).map(|dep| &dep.value)
    }

    /// Build an `ExecutionError` attributed to this request's variable.
    pub fn error(&self, message: impl Into<String>) -> ExecutionError {
        ExecutionError::new(self.variable.clone(), message)
    }
}

/// Computes variable values.
///
/// Called once per affected dependent per propagation chain, never
/// concurrently within one chain. Timeouts are the implementor's concern.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, request: &ExecutionRequest) -> Result<Value, ExecutionError>;
}

/// Executor backed by a synchronous closure.
///
/// # Example
///
/// ```rust,ignore
/// let executor = FnExecutor::new(|req| {
///     let a = req.value("a").and_then(Value::as_i64).ok_or_else(|| req.error("no a"))?;
///     Ok(json!(a * 2))
/// });
/// ```
pub struct FnExecutor<F> {
    f: F,
}

impl<F> FnExecutor<F>
where
    F: Fn(&ExecutionRequest) -> Result<Value, ExecutionError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F> Executor for FnExecutor<F>
where
    F: Fn(&ExecutionRequest) -> Result<Value, ExecutionError> + Send + Sync,
{
    async fn execute(&self, request: &ExecutionRequest) -> Result<Value, ExecutionError> {
        (self.f)(request)
    }
}
