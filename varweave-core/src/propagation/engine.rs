//! Propagation Engine
//!
//! The engine recomputes everything downstream of a changed value.
//!
//! # Algorithm
//!
//! 1. Commit the new value (no-op if equal to the stored one)
//! 2. Collect the transitive dependents of the changed variable
//! 3. Order them by the global topological order, so each one is processed
//!    after all of its own dependencies have settled
//! 4. For each dependent, in order:
//!    - skip it if it has no code or a dependency has no value yet
//!    - otherwise run the executor and commit the result
//!
//! With `prune_unchanged` enabled, a dependent that already has a value and
//! none of whose dependencies changed in this chain is skipped as settled.
//!
//! Executor failures are logged and recorded in the report; they never stop
//! the rest of the chain. Each executor call is awaited before the next one
//! starts.

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::executor::{DependencyValue, ExecutionRequest, Executor};
use super::observer::ObserverSet;
use super::report::{PropagationReport, SkipReason, StepOutcome};
use crate::config::EngineConfig;
use crate::error::{ExecutionError, Result, VarError};
use crate::persistence::Persistence;
use crate::variable::{validate_name, VariableStore};

/// Drives value commits and recomputation chains for one document.
///
/// Holds collaborators only; the store is passed into every call. Change
/// notifications are queued on the observer set, and the caller delivers
/// them with `ObserverSet::flush` once it no longer holds the store.
pub struct PropagationEngine {
    document_id: String,
    executor: Arc<dyn Executor>,
    persistence: Option<Arc<dyn Persistence>>,
    observers: Arc<ObserverSet>,
    config: EngineConfig,
}

impl PropagationEngine {
    /// Create an engine with no persistence and no observers.
    pub fn new(document_id: impl Into<String>, executor: Arc<dyn Executor>) -> Self {
        Self {
            document_id: document_id.into(),
            executor,
            persistence: None,
            observers: Arc::new(ObserverSet::new()),
            config: EngineConfig::default(),
        }
    }

    /// Save the store through `persistence` after every committed change.
    pub fn with_persistence(mut self, persistence: Arc<dyn Persistence>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    /// Share an existing observer set.
    pub fn with_observers(mut self, observers: Arc<ObserverSet>) -> Self {
        self.observers = observers;
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn observers(&self) -> &Arc<ObserverSet> {
        &self.observers
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn persistence(&self) -> Option<&Arc<dyn Persistence>> {
        self.persistence.as_ref()
    }

    /// Set `name` to `value` and recompute everything downstream of it.
    ///
    /// Returns an empty report when the value is unchanged.
    #[instrument(skip(self, store, value), fields(document = %self.document_id))]
    pub async fn set_value(
        &self,
        store: &mut VariableStore,
        name: &str,
        value: Value,
    ) -> Result<PropagationReport> {
        if !self.commit_value(store, name, value).await? {
            return Ok(PropagationReport::new(Some(name), false));
        }
        Ok(self.propagate(store, name).await)
    }

    /// Store a value without propagating it.
    ///
    /// Returns `Ok(false)` when the stored value already equals `value`.
    pub async fn commit_value(
        &self,
        store: &mut VariableStore,
        name: &str,
        value: Value,
    ) -> Result<bool> {
        validate_name(name)?;
        let variable = store
            .get_mut(name)
            .ok_or_else(|| VarError::UnknownVariable {
                name: name.to_string(),
            })?;

        if variable.value() == Some(&value) {
            debug!(variable = name, "value unchanged");
            return Ok(false);
        }

        variable.set_value(value);
        debug!(variable = name, "value committed");

        self.persist(store).await;
        if let Some(value) = store.get(name).and_then(|v| v.value()) {
            self.observers.enqueue_variable_changed(name, value);
        }
        Ok(true)
    }

    /// Recompute the transitive dependents of `source`.
    ///
    /// Assumes `source` has just changed. Every dependent with code and all
    /// of its inputs present is executed exactly once, so the chain makes at
    /// most `|transitive_dependents(source)|` executor calls regardless of
    /// graph shape.
    pub async fn propagate(&self, store: &mut VariableStore, source: &str) -> PropagationReport {
        let mut report = PropagationReport::new(Some(source), true);

        let order = {
            let graph = store.graph();
            let affected = graph.transitive_dependents(source);
            if affected.is_empty() {
                return report;
            }
            graph.order_subset(&affected)
        };
        debug!(source, affected = order.len(), "propagating");

        let mut changed: HashSet<String> = HashSet::new();
        changed.insert(source.to_string());

        for name in order {
            let outcome = self.recompute_step(store, &name, Some(&changed)).await;
            if outcome == StepOutcome::Updated {
                changed.insert(name.clone());
            }
            report.push(name, outcome);
        }

        info!(
            source,
            executed = report.executor_calls(),
            updated = report.updated().len(),
            failed = report.failed().len(),
            "propagation finished"
        );
        report
    }

    /// Run `name`'s own code, commit the result and propagate it.
    ///
    /// Unlike failures inside a chain, an executor failure here is returned
    /// to the caller, since they asked for this variable specifically.
    pub async fn recompute(
        &self,
        store: &mut VariableStore,
        name: &str,
    ) -> Result<PropagationReport> {
        validate_name(name)?;
        if !store.contains(name) {
            return Err(VarError::UnknownVariable {
                name: name.to_string(),
            });
        }

        let request = match self.build_request(store, name, None) {
            Ok(request) => request,
            Err(reason) => {
                info!(variable = name, ?reason, "cannot recompute");
                let mut report = PropagationReport::new(Some(name), false);
                report.push(name, StepOutcome::Skipped(reason));
                return Ok(report);
            }
        };

        let value = self.executor.execute(&request).await?;
        self.set_value(store, name, value).await
    }

    /// Evaluate every variable that has code, in topological order.
    ///
    /// Used after loading a document, when nothing has been computed yet.
    pub async fn recompute_all(&self, store: &mut VariableStore) -> PropagationReport {
        let mut report = PropagationReport::new(None, false);
        let order = store.graph().topological_order();

        for name in order {
            let has_code = store.get(&name).and_then(|v| v.code()).is_some();
            if !has_code {
                continue;
            }
            let outcome = self.recompute_step(store, &name, None).await;
            report.push(name, outcome);
        }

        info!(
            executed = report.executor_calls(),
            updated = report.updated().len(),
            failed = report.failed().len(),
            "full recompute finished"
        );
        report
    }

    /// Save the whole store, logging instead of failing.
    ///
    /// In-memory state stays authoritative; the next successful save wins.
    pub(crate) async fn persist(&self, store: &VariableStore) {
        if !self.config.persist_on_change {
            return;
        }
        let Some(persistence) = &self.persistence else {
            return;
        };
        if let Err(err) = persistence.save(&self.document_id, &store.to_variables()).await {
            warn!(document = %self.document_id, error = %err, "failed to persist variables");
        }
    }

    async fn recompute_step(
        &self,
        store: &mut VariableStore,
        name: &str,
        changed: Option<&HashSet<String>>,
    ) -> StepOutcome {
        let request = match self.build_request(store, name, changed) {
            Ok(request) => request,
            Err(reason) => {
                match &reason {
                    SkipReason::MissingDependencies(missing) => {
                        info!(variable = name, ?missing, "skipping: dependency values missing")
                    }
                    _ => debug!(variable = name, ?reason, "skipping"),
                }
                return StepOutcome::Skipped(reason);
            }
        };

        debug!(variable = name, "executing");
        let value = match self.executor.execute(&request).await {
            Ok(value) => value,
            Err(err) => {
                warn!(variable = name, error = %err, "executor failed");
                return StepOutcome::Failed(err);
            }
        };

        match self.commit_value(store, name, value).await {
            Ok(true) => StepOutcome::Updated,
            Ok(false) => StepOutcome::Unchanged,
            Err(err) => {
                warn!(variable = name, error = %err, "failed to commit computed value");
                StepOutcome::Failed(ExecutionError::new(name, err.to_string()))
            }
        }
    }

    /// Gather what the executor needs, or say why the variable can't run.
    ///
    /// With `changed` set and pruning enabled, a variable that has a value
    /// and none of whose dependencies are in `changed` is reported as settled.
    fn build_request(
        &self,
        store: &VariableStore,
        name: &str,
        changed: Option<&HashSet<String>>,
    ) -> std::result::Result<ExecutionRequest, SkipReason> {
        let Some(variable) = store.get(name) else {
            return Err(SkipReason::NoCode);
        };
        let Some(code) = variable.code() else {
            return Err(SkipReason::NoCode);
        };

        let mut dependencies = IndexMap::with_capacity(variable.dependencies().len());
        let mut missing = Vec::new();
        for dep_name in variable.dependencies() {
            let dep = store.get(dep_name);
            match dep.and_then(|d| d.value()) {
                Some(value) => {
                    dependencies.insert(
                        dep_name.clone(),
                        DependencyValue {
                            value: value.clone(),
                            value_type: dep.and_then(|d| d.value_type()).map(str::to_string),
                            description: dep.and_then(|d| d.description()).map(str::to_string),
                            format: dep.and_then(|d| d.format()).map(str::to_string),
                        },
                    );
                }
                None => missing.push(dep_name.clone()),
            }
        }
        if !missing.is_empty() {
            return Err(SkipReason::MissingDependencies(missing));
        }

        if let Some(changed) = changed {
            let any_changed = variable.dependencies().iter().any(|d| changed.contains(d));
            if self.config.prune_unchanged && variable.value().is_some() && !any_changed {
                return Err(SkipReason::Settled);
            }
        }

        Ok(ExecutionRequest {
            variable: name.to_string(),
            code: code.to_string(),
            dependencies,
            data_source: self.config.data_source.clone(),
        })
    }
}

impl std::fmt::Debug for PropagationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropagationEngine")
            .field("document_id", &self.document_id)
            .field("has_persistence", &self.persistence.is_some())
            .field("observers", &self.observers)
            .field("config", &self.config)
            .finish()
    }
}
