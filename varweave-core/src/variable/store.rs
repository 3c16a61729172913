//! Variable Store
//!
//! Ordered, in-memory collection of variables. Iteration order is the
//! insertion order, which stays stable for the lifetime of the store and is
//! preserved across save/load.

use indexmap::IndexMap;

use super::name::validate_name;
use super::record::Variable;
use crate::error::{Result, VarError};
use crate::graph::DependencyGraph;

/// The variables of one document, indexed by name.
#[derive(Debug, Clone, Default)]
pub struct VariableStore {
    variables: IndexMap<String, Variable>,
}

impl VariableStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            variables: IndexMap::new(),
        }
    }

    /// Build a store from a list of variables, checking every invariant.
    ///
    /// Rejects malformed names, duplicates, dependencies on names that are
    /// not in the list, and cycles.
    pub fn from_variables<I>(variables: I) -> Result<Self>
    where
        I: IntoIterator<Item = Variable>,
    {
        let mut store = Self::new();
        for variable in variables {
            validate_name(variable.name())?;
            if store.contains(variable.name()) {
                return Err(VarError::DuplicateVariable {
                    name: variable.name().to_string(),
                });
            }
            store.upsert(variable);
        }

        for variable in store.variables.values() {
            if let Some(missing) = variable
                .dependencies()
                .iter()
                .find(|dep| !store.contains(dep))
            {
                return Err(VarError::UnknownVariable {
                    name: missing.clone(),
                });
            }
        }

        if let Some(path) = store.graph().find_any_cycle() {
            return Err(VarError::Cycle {
                name: path[0].clone(),
                path,
            });
        }

        Ok(store)
    }

    /// Get a variable by name.
    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.variables.get_mut(name)
    }

    /// Insert a variable, or replace the one with the same name in place.
    ///
    /// No cycle checking happens here.
    pub fn upsert(&mut self, variable: Variable) {
        self.variables.insert(variable.name().to_string(), variable);
    }

    /// Remove a variable, keeping the order of the remaining ones.
    ///
    /// Callers are responsible for dependents that still reference it.
    pub fn remove(&mut self, name: &str) -> Option<Variable> {
        self.variables.shift_remove(name)
    }

    /// Iterate over all variables in insertion order.
    pub fn all(&self) -> impl Iterator<Item = (&str, &Variable)> {
        self.variables.iter().map(|(name, var)| (name.as_str(), var))
    }

    /// Iterate over the names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Take a graph snapshot of the current dependency edges.
    pub fn graph(&self) -> DependencyGraph<'_> {
        DependencyGraph::from_store(self)
    }

    /// Clone every variable out, in order.
    pub fn to_variables(&self) -> Vec<Variable> {
        self.variables.values().cloned().collect()
    }

    /// Rename a key in place, keeping its position.
    ///
    /// Returns false if `old` is absent or `new` is taken.
    pub(crate) fn rename_key(&mut self, old: &str, new: &str) -> bool {
        if self.contains(new) {
            return false;
        }
        let Some(index) = self.variables.get_index_of(old) else {
            return false;
        };
        let Some((_, mut variable)) = self.variables.shift_remove_index(index) else {
            return false;
        };
        variable.set_name(new.to_string());
        let (last, _) = self.variables.insert_full(new.to_string(), variable);
        self.variables.move_index(last, index);
        true
    }
}
