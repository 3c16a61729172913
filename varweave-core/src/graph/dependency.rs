//! Graph Snapshot
//!
//! Borrowed view of the store's dependency edges plus dependent lookups.

use std::collections::{BTreeSet, HashMap, VecDeque};

use indexmap::IndexMap;

use crate::variable::VariableStore;

/// Snapshot of `{name -> dependencies}` taken from a `VariableStore`.
///
/// All queries are pure; the snapshot never mutates the store.
#[derive(Debug, Clone)]
pub struct DependencyGraph<'a> {
    /// Forward edges in store order: variable -> what it reads.
    pub(super) edges: IndexMap<&'a str, &'a [String]>,

    /// Reverse edges: variable -> variables that read it.
    pub(super) dependents: HashMap<&'a str, Vec<&'a str>>,
}

impl<'a> DependencyGraph<'a> {
    /// Build a snapshot of the store's current edges.
    pub fn from_store(store: &'a VariableStore) -> Self {
        let mut edges = IndexMap::with_capacity(store.len());
        let mut dependents: HashMap<&'a str, Vec<&'a str>> = HashMap::new();

        for (name, variable) in store.all() {
            edges.insert(name, variable.dependencies());
            for dep in variable.dependencies() {
                dependents.entry(dep.as_str()).or_default().push(name);
            }
        }

        Self { edges, dependents }
    }

    /// Number of variables in the snapshot.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.edges.contains_key(name)
    }

    /// Declared dependencies of `name`, empty if unknown.
    pub fn dependencies_of(&self, name: &str) -> &'a [String] {
        self.edges.get(name).copied().unwrap_or(&[])
    }

    /// Variables whose dependency list contains `name`.
    pub fn direct_dependents(&self, name: &str) -> BTreeSet<&'a str> {
        self.dependents
            .get(name)
            .map(|deps| deps.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Everything downstream of `name`, excluding `name` itself.
    ///
    /// Breadth-first over reverse edges; each node is visited once, so this
    /// terminates even if the snapshot somehow contains a cycle.
    pub fn transitive_dependents(&self, name: &str) -> BTreeSet<&'a str> {
        let mut found = BTreeSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        queue.push_back(name);

        while let Some(current) = queue.pop_front() {
            let Some(next) = self.dependents.get(current) else {
                continue;
            };
            for &dependent in next {
                if dependent != name && found.insert(dependent) {
                    queue.push_back(dependent);
                }
            }
        }

        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variable::Variable;

    fn store(edges: &[(&str, &[&str])]) -> VariableStore {
        let mut store = VariableStore::new();
        for (name, deps) in edges {
            store.upsert(Variable::new(*name).with_dependencies(deps.iter().copied()));
        }
        store
    }

    #[test]
    fn direct_dependents_of_shared_dependency() {
        let store = store(&[("a", &[]), ("b", &["a"]), ("c", &["a"]), ("d", &["b"])]);
        let graph = store.graph();
        assert_eq!(
            graph.direct_dependents("a").into_iter().collect::<Vec<_>>(),
            vec!["b", "c"]
        );
        assert!(graph.direct_dependents("d").is_empty());
        assert!(graph.direct_dependents("missing").is_empty());
    }

    #[test]
    fn transitive_dependents_excludes_source() {
        let store = store(&[("a", &[]), ("b", &["a"]), ("c", &["b"]), ("x", &[])]);
        let graph = store.graph();
        let downstream: Vec<_> = graph.transitive_dependents("a").into_iter().collect();
        assert_eq!(downstream, vec!["b", "c"]);
        assert!(graph.transitive_dependents("c").is_empty());
    }

    #[test]
    fn transitive_dependents_diamond_visits_once() {
        let store = store(&[
            ("a", &[]),
            ("b", &["a"]),
            ("c", &["a"]),
            ("d", &["b", "c"]),
        ]);
        let downstream: Vec<_> = store.graph().transitive_dependents("a").into_iter().collect();
        assert_eq!(downstream, vec!["b", "c", "d"]);
    }

    #[test]
    fn transitive_dependents_terminates_on_cycle() {
        // Built with upsert, which skips cycle checks.
        let store = store(&[("a", &["c"]), ("b", &["a"]), ("c", &["b"])]);
        let downstream: Vec<_> = store.graph().transitive_dependents("a").into_iter().collect();
        assert_eq!(downstream, vec!["b", "c"]);
    }

    #[test]
    fn dependencies_of_unknown_is_empty() {
        let store = store(&[("a", &[])]);
        assert!(store.graph().dependencies_of("nope").is_empty());
    }
}
