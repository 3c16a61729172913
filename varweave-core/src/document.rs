//! Documents
//!
//! A `Document` is one variable store plus the engine that maintains it.
//! It is the only place where the store is mutated, and the edit path the
//! UI calls into: every dependency edit is cycle-checked here before it is
//! committed.
//!
//! # Concurrency
//!
//! The store sits behind an async mutex that is held for the whole of each
//! operation, including every executor call of a propagation chain. Two
//! callers setting values on the same document are serialized, so no chain
//! ever reads a dependency value another chain is halfway through updating.
//!
//! Observers are notified only after the lock is released, so an observer
//! may read from or write to the same document.
//!
//! # Rename and remove
//!
//! - Renaming cascades: every dependency list naming the old variable is
//!   rewritten in the same critical section.
//! - Removing is refused while any variable still depends on the target.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::config::EngineConfig;
use crate::error::{PersistenceError, Result, VarError};
use crate::persistence::Persistence;
use crate::propagation::{Executor, ObserverSet, PropagationEngine, PropagationReport};
use crate::variable::{validate_name, Variable, VariableStore};

/// A set of variables and the machinery that keeps them consistent.
#[derive(Debug)]
pub struct Document {
    store: Mutex<VariableStore>,
    engine: PropagationEngine,
}

impl Document {
    /// Create an empty document.
    pub fn new(id: impl Into<String>, executor: Arc<dyn Executor>) -> Self {
        Self::from_engine(PropagationEngine::new(id, executor), VariableStore::new())
    }

    /// Wrap an existing store with a configured engine.
    pub fn from_engine(engine: PropagationEngine, store: VariableStore) -> Self {
        Self {
            store: Mutex::new(store),
            engine,
        }
    }

    /// Open a document from persistence.
    ///
    /// The loaded variables must satisfy every store invariant; a snapshot
    /// with malformed names, dangling references or a cycle is rejected.
    pub async fn load(
        id: impl Into<String>,
        executor: Arc<dyn Executor>,
        persistence: Arc<dyn Persistence>,
        config: EngineConfig,
    ) -> Result<Self> {
        let id = id.into();
        let variables = persistence.load(&id).await?;
        let count = variables.len();
        let store = VariableStore::from_variables(variables).map_err(|err| {
            PersistenceError::CorruptSnapshot {
                document_id: id.clone(),
                cause: err.to_string(),
            }
        })?;

        info!(document = %id, variables = count, "document loaded");
        let engine = PropagationEngine::new(id, executor)
            .with_persistence(persistence)
            .with_config(config);
        Ok(Self::from_engine(engine, store))
    }

    pub fn id(&self) -> &str {
        self.engine.document_id()
    }

    pub fn observers(&self) -> &Arc<ObserverSet> {
        self.engine.observers()
    }

    pub fn config(&self) -> &EngineConfig {
        self.engine.config()
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Clone of one variable.
    pub async fn get(&self, name: &str) -> Option<Variable> {
        self.store.lock().await.get(name).cloned()
    }

    /// Current value of one variable.
    pub async fn value(&self, name: &str) -> Option<Value> {
        self.store.lock().await.get(name).and_then(|v| v.value().cloned())
    }

    /// Clone of every variable, in store order.
    pub async fn snapshot(&self) -> Vec<Variable> {
        self.store.lock().await.to_variables()
    }

    pub async fn len(&self) -> usize {
        self.store.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.lock().await.is_empty()
    }

    /// Deterministic evaluation order of all variables.
    pub async fn topological_order(&self) -> Vec<String> {
        self.store.lock().await.graph().topological_order()
    }

    /// Everything downstream of `name`, sorted by name.
    pub async fn transitive_dependents(&self, name: &str) -> Result<Vec<String>> {
        let store = self.store.lock().await;
        require(&store, name)?;
        Ok(store
            .graph()
            .transitive_dependents(name)
            .into_iter()
            .map(str::to_string)
            .collect())
    }

    // ------------------------------------------------------------------
    // Edit path
    // ------------------------------------------------------------------

    /// Add a new variable.
    ///
    /// Its dependency list goes through the same checks as
    /// `propose_dependency_change`.
    #[instrument(skip(self, variable), fields(document = %self.id(), variable = %variable.name()))]
    pub async fn add_variable(&self, variable: Variable) -> Result<()> {
        let mut store = self.store.lock().await;
        validate_name(variable.name())?;
        if store.contains(variable.name()) {
            return Err(VarError::DuplicateVariable {
                name: variable.name().to_string(),
            });
        }
        check_dependencies(&store, variable.name(), variable.dependencies())?;

        store.upsert(variable);
        self.structure_changed(&store).await;
        drop(store);
        self.observers().flush();
        Ok(())
    }

    /// Check a dependency edit without committing it.
    ///
    /// Returns the normalized list (duplicates dropped) on success.
    pub async fn check_dependency_change(
        &self,
        name: &str,
        dependencies: Vec<String>,
    ) -> Result<Vec<String>> {
        let store = self.store.lock().await;
        require(&store, name)?;
        let dependencies = dedup(dependencies);
        check_dependencies(&store, name, &dependencies)?;
        Ok(dependencies)
    }

    /// Replace `name`'s dependency list, if doing so keeps the graph valid.
    ///
    /// Rejected edits (`Cycle`, `UnknownVariable`, `InvalidName`) leave the
    /// graph untouched.
    #[instrument(skip(self, dependencies), fields(document = %self.id()))]
    pub async fn propose_dependency_change(
        &self,
        name: &str,
        dependencies: Vec<String>,
    ) -> Result<()> {
        let mut store = self.store.lock().await;
        require(&store, name)?;
        let dependencies = dedup(dependencies);
        check_dependencies(&store, name, &dependencies)?;

        let Some(variable) = store.get_mut(name) else {
            return Err(unknown(name));
        };
        if variable.dependencies() == dependencies.as_slice() {
            return Ok(());
        }
        variable.set_dependencies(dependencies);
        debug!(variable = name, "dependencies updated");

        self.structure_changed(&store).await;
        drop(store);
        self.observers().flush();
        Ok(())
    }

    /// Replace the code of a variable. Does not recompute it.
    pub async fn set_code(&self, name: &str, code: Option<String>) -> Result<()> {
        let mut store = self.store.lock().await;
        require(&store, name)?;
        if let Some(variable) = store.get_mut(name) {
            variable.set_code(code);
        }
        self.engine.persist(&store).await;
        Ok(())
    }

    /// Replace a variable's type, description and format.
    pub async fn set_metadata(
        &self,
        name: &str,
        value_type: Option<String>,
        description: Option<String>,
        format: Option<String>,
    ) -> Result<()> {
        let mut store = self.store.lock().await;
        require(&store, name)?;
        if let Some(variable) = store.get_mut(name) {
            variable.set_metadata(value_type, description, format);
        }
        self.engine.persist(&store).await;
        Ok(())
    }

    /// Rename a variable and every reference to it.
    #[instrument(skip(self), fields(document = %self.id()))]
    pub async fn rename_variable(&self, old: &str, new: &str) -> Result<()> {
        let mut store = self.store.lock().await;
        require(&store, old)?;
        validate_name(new)?;
        if old == new {
            return Ok(());
        }
        if store.contains(new) {
            return Err(VarError::DuplicateVariable {
                name: new.to_string(),
            });
        }

        let dependents: Vec<String> = store
            .graph()
            .direct_dependents(old)
            .into_iter()
            .map(str::to_string)
            .collect();
        for dependent in &dependents {
            if let Some(variable) = store.get_mut(dependent) {
                variable.rename_dependency(old, new);
            }
        }
        if !store.rename_key(old, new) {
            return Err(unknown(old));
        }
        info!(old, new, rewritten = dependents.len(), "variable renamed");

        self.structure_changed(&store).await;
        drop(store);
        self.observers().flush();
        Ok(())
    }

    /// Remove a variable nothing depends on.
    #[instrument(skip(self), fields(document = %self.id()))]
    pub async fn remove_variable(&self, name: &str) -> Result<Variable> {
        let mut store = self.store.lock().await;
        require(&store, name)?;

        let dependents = store.graph().direct_dependents(name);
        if !dependents.is_empty() {
            return Err(VarError::StillReferenced {
                name: name.to_string(),
                dependents: dependents.into_iter().map(str::to_string).collect(),
            });
        }

        let removed = store.remove(name).ok_or_else(|| unknown(name))?;
        self.structure_changed(&store).await;
        drop(store);
        self.observers().flush();
        Ok(removed)
    }

    // ------------------------------------------------------------------
    // Values
    // ------------------------------------------------------------------

    /// Set a value and recompute everything downstream of it.
    pub async fn set_value(&self, name: &str, value: Value) -> Result<PropagationReport> {
        let result = {
            let mut store = self.store.lock().await;
            self.engine.set_value(&mut store, name, value).await
        };
        self.observers().flush();
        result
    }

    /// Run a variable's own code and propagate the result.
    pub async fn recompute(&self, name: &str) -> Result<PropagationReport> {
        let result = {
            let mut store = self.store.lock().await;
            self.engine.recompute(&mut store, name).await
        };
        self.observers().flush();
        result
    }

    /// Evaluate every variable with code, in topological order.
    pub async fn recompute_all(&self) -> PropagationReport {
        let report = {
            let mut store = self.store.lock().await;
            self.engine.recompute_all(&mut store).await
        };
        self.observers().flush();
        report
    }

    /// Save now, reporting failure to the caller.
    ///
    /// Does nothing if the document has no persistence backend.
    pub async fn save(&self) -> Result<()> {
        let store = self.store.lock().await;
        if let Some(persistence) = self.engine.persistence() {
            persistence.save(self.id(), &store.to_variables()).await?;
        }
        Ok(())
    }

    async fn structure_changed(&self, store: &VariableStore) {
        self.engine.persist(store).await;
        self.engine.observers().enqueue_graph_changed();
    }
}

fn unknown(name: &str) -> VarError {
    VarError::UnknownVariable {
        name: name.to_string(),
    }
}

fn require(store: &VariableStore, name: &str) -> Result<()> {
    validate_name(name)?;
    if store.contains(name) {
        Ok(())
    } else {
        Err(unknown(name))
    }
}

fn dedup(dependencies: Vec<String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(dependencies.len());
    for dep in dependencies {
        if !unique.contains(&dep) {
            unique.push(dep);
        }
    }
    unique
}

/// Every dependency must be a known variable, and the edit must not close
/// a cycle. Naming `name` itself is reported as a cycle.
fn check_dependencies(store: &VariableStore, name: &str, dependencies: &[String]) -> Result<()> {
    for dep in dependencies {
        validate_name(dep)?;
        if dep != name && !store.contains(dep) {
            return Err(unknown(dep));
        }
    }

    if let Some(path) = store.graph().find_cycle(name, dependencies) {
        info!(variable = name, cycle = %path.join(" -> "), "dependency change rejected");
        return Err(VarError::Cycle {
            name: name.to_string(),
            path,
        });
    }
    Ok(())
}
