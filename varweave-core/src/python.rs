// ----------------------------------------------------------------------------
// Python Bindings
// ----------------------------------------------------------------------------
//
// Exposes `Document` to Python. Values cross the boundary as JSON strings,
// and the executor is a Python callable that receives the JSON-encoded
// request and returns the JSON-encoded value.

use std::sync::Arc;

use async_trait::async_trait;
use pyo3::exceptions::{PyKeyError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use serde_json::Value;

use crate::config::EngineConfig;
use crate::document::Document;
use crate::error::{ExecutionError, VarError};
use crate::propagation::{ExecutionRequest, Executor, PropagationEngine};
use crate::variable::{Variable, VariableStore};

/// Executor that calls back into Python.
struct PyExecutor {
    callable: Py<PyAny>,
}

#[async_trait]
impl Executor for PyExecutor {
    async fn execute(&self, request: &ExecutionRequest) -> Result<Value, ExecutionError> {
        let payload = serde_json::to_string(request).map_err(|e| request.error(e.to_string()))?;
        Python::with_gil(|py| {
            let result = self
                .callable
                .call1(py, (payload,))
                .map_err(|e| request.error(e.to_string()))?;
            let text: String = result
                .extract(py)
                .map_err(|e| request.error(e.to_string()))?;
            serde_json::from_str(&text).map_err(|e| request.error(e.to_string()))
        })
    }
}

fn to_py_err(err: VarError) -> PyErr {
    match err {
        VarError::UnknownVariable { .. } => PyKeyError::new_err(err.to_string()),
        VarError::InvalidName { .. }
        | VarError::DuplicateVariable { .. }
        | VarError::Cycle { .. }
        | VarError::StillReferenced { .. } => PyValueError::new_err(err.to_string()),
        _ => PyRuntimeError::new_err(err.to_string()),
    }
}

fn parse_json(text: &str) -> PyResult<Value> {
    serde_json::from_str(text).map_err(|e| PyValueError::new_err(format!("invalid JSON: {e}")))
}

/// Python-exposed Document type.
///
/// Each instance owns a single-threaded tokio runtime; calls block until the
/// whole propagation chain has finished.
#[pyclass(name = "Document")]
pub struct PyDocument {
    document: Arc<Document>,
    runtime: tokio::runtime::Runtime,
}

#[pymethods]
impl PyDocument {
    #[new]
    #[pyo3(signature = (id, executor, data_source=None))]
    fn new(id: String, executor: PyObject, data_source: Option<String>) -> PyResult<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| PyRuntimeError::new_err(e.to_string()))?;

        let config = EngineConfig {
            data_source,
            ..EngineConfig::default()
        };
        let engine = PropagationEngine::new(id, Arc::new(PyExecutor { callable: executor }))
            .with_config(config);

        Ok(Self {
            document: Arc::new(Document::from_engine(engine, VariableStore::new())),
            runtime,
        })
    }

    #[getter]
    fn id(&self) -> String {
        self.document.id().to_string()
    }

    #[pyo3(signature = (name, dependencies=None, code=None, description=None))]
    fn add_variable(
        &self,
        name: String,
        dependencies: Option<Vec<String>>,
        code: Option<String>,
        description: Option<String>,
    ) -> PyResult<()> {
        let mut variable = Variable::new(name).with_dependencies(dependencies.unwrap_or_default());
        if let Some(code) = code {
            variable = variable.with_code(code);
        }
        if let Some(description) = description {
            variable = variable.with_description(description);
        }
        self.runtime
            .block_on(self.document.add_variable(variable))
            .map_err(to_py_err)
    }

    fn propose_dependency_change(&self, name: &str, dependencies: Vec<String>) -> PyResult<()> {
        self.runtime
            .block_on(self.document.propose_dependency_change(name, dependencies))
            .map_err(to_py_err)
    }

    /// True if the edit would be rejected as a cycle. Nothing is committed.
    fn would_create_cycle(&self, name: &str, dependencies: Vec<String>) -> PyResult<bool> {
        match self
            .runtime
            .block_on(self.document.check_dependency_change(name, dependencies))
        {
            Ok(_) => Ok(false),
            Err(VarError::Cycle { .. }) => Ok(true),
            Err(err) => Err(to_py_err(err)),
        }
    }

    /// Set a JSON value. Returns the names of the variables that changed.
    fn set_value(&self, name: &str, value_json: &str) -> PyResult<Vec<String>> {
        let value = parse_json(value_json)?;
        let report = self
            .runtime
            .block_on(self.document.set_value(name, value))
            .map_err(to_py_err)?;
        Ok(report.updated().into_iter().map(str::to_string).collect())
    }

    /// Current value as JSON, or None.
    fn value(&self, name: &str) -> Option<String> {
        self.runtime
            .block_on(self.document.value(name))
            .map(|v| v.to_string())
    }

    fn topological_order(&self) -> Vec<String> {
        self.runtime.block_on(self.document.topological_order())
    }

    fn transitive_dependents(&self, name: &str) -> PyResult<Vec<String>> {
        self.runtime
            .block_on(self.document.transitive_dependents(name))
            .map_err(to_py_err)
    }

    fn rename_variable(&self, old: &str, new: &str) -> PyResult<()> {
        self.runtime
            .block_on(self.document.rename_variable(old, new))
            .map_err(to_py_err)
    }

    fn remove_variable(&self, name: &str) -> PyResult<()> {
        self.runtime
            .block_on(self.document.remove_variable(name))
            .map(|_| ())
            .map_err(to_py_err)
    }

    fn __len__(&self) -> usize {
        self.runtime.block_on(self.document.len())
    }

    fn __repr__(&self) -> String {
        format!("Document(id={:?}, variables={})", self.document.id(), self.__len__())
    }
}

/// Python module definition.
///
/// This function is called by Python when importing the module.
#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyDocument>()?;

    // Add version info
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
