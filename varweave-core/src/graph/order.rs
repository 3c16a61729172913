//! Topological Ordering
//!
//! Kahn's algorithm over the snapshot:
//!
//! 1. The in-degree of a variable is the number of dependencies it has
//!    (edges point dependent -> dependency, so leaves are ready first)
//! 2. Repeatedly take the smallest ready name, emit it, and decrement the
//!    in-degree of everything that depends on it
//! 3. Names whose in-degree drops to zero become ready
//!
//! Taking the smallest ready name makes the order deterministic.

use std::collections::{BTreeSet, HashMap};

use super::dependency::DependencyGraph;

impl<'a> DependencyGraph<'a> {
    /// Order every variable so that each comes after all of its dependencies.
    ///
    /// If the snapshot contains a cycle the affected names can never become
    /// ready. They are appended in lexicographic order and the inconsistency
    /// is logged; the store's invariants should make this unreachable.
    pub fn topological_order(&self) -> Vec<String> {
        let mut in_degree: HashMap<&'a str, usize> = HashMap::with_capacity(self.edges.len());
        let mut ready: BTreeSet<&'a str> = BTreeSet::new();

        // Only edges to variables inside the snapshot count
        for (&name, deps) in &self.edges {
            let degree = deps
                .iter()
                .filter(|d| self.edges.contains_key(d.as_str()))
                .count();
            in_degree.insert(name, degree);
            if degree == 0 {
                ready.insert(name);
            }
        }

        let mut order = Vec::with_capacity(self.edges.len());
        while let Some(name) = ready.pop_first() {
            order.push(name.to_string());

            let Some(dependents) = self.dependents.get(name) else {
                continue;
            };
            for &dependent in dependents {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree = degree.saturating_sub(1);
                    if *degree == 0 {
                        ready.insert(dependent);
                    }
                }
            }
        }

        if order.len() < self.edges.len() {
            let emitted: BTreeSet<&str> = order.iter().map(String::as_str).collect();
            let remainder: BTreeSet<&str> = self
                .edges
                .keys()
                .copied()
                .filter(|name| !emitted.contains(name))
                .collect();
            tracing::error!(
                ordered = order.len(),
                total = self.edges.len(),
                unordered = ?remainder,
                "dependency graph contains a cycle; appending unordered variables"
            );
            order.extend(remainder.into_iter().map(str::to_string));
        }

        order
    }

    /// The global topological order restricted to `subset`.
    ///
    /// Relative order is preserved, so every member comes after all of its
    /// own dependencies whether or not they are in `subset`.
    pub fn order_subset(&self, subset: &BTreeSet<&str>) -> Vec<String> {
        self.topological_order()
            .into_iter()
            .filter(|name| subset.contains(name.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use crate::variable::{Variable, VariableStore};

    fn store(edges: &[(&str, &[&str])]) -> VariableStore {
        let mut store = VariableStore::new();
        for (name, deps) in edges {
            store.upsert(Variable::new(*name).with_dependencies(deps.iter().copied()));
        }
        store
    }

    fn position(order: &[String], name: &str) -> usize {
        order.iter().position(|n| n == name).unwrap()
    }

    #[test]
    fn chain_is_ordered() {
        let store = store(&[("c", &["b"]), ("b", &["a"]), ("a", &[])]);
        assert_eq!(store.graph().topological_order(), vec!["a", "b", "c"]);
    }

    #[test]
    fn ties_break_lexicographically() {
        let store = store(&[("zeta", &[]), ("alpha", &[]), ("mid", &[])]);
        assert_eq!(
            store.graph().topological_order(),
            vec!["alpha", "mid", "zeta"]
        );
    }

    #[test]
    fn every_variable_follows_its_dependencies() {
        let store = store(&[
            ("report", &["total", "rate"]),
            ("total", &["rows"]),
            ("rows", &[]),
            ("rate", &[]),
            ("summary", &["report", "rows"]),
        ]);
        let graph = store.graph();
        let order = graph.topological_order();
        assert_eq!(order.len(), store.len());

        for (name, variable) in store.all() {
            for dep in variable.dependencies() {
                assert!(position(&order, dep) < position(&order, name));
            }
        }
        assert_eq!(order, vec!["rate", "rows", "total", "report", "summary"]);
    }

    #[test]
    fn order_is_reproducible() {
        let store = store(&[("b", &["a"]), ("c", &["a"]), ("a", &[]), ("d", &[])]);
        let graph = store.graph();
        let first = graph.topological_order();
        for _ in 0..10 {
            assert_eq!(graph.topological_order(), first);
        }
        assert_eq!(first, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn cycle_remainder_is_appended_sorted() {
        let store = store(&[("x", &[]), ("b", &["a"]), ("a", &["b"]), ("y", &["x"])]);
        assert_eq!(store.graph().topological_order(), vec!["x", "y", "a", "b"]);
    }

    #[test]
    fn subset_keeps_global_order() {
        let store = store(&[
            ("a", &[]),
            ("b", &["a"]),
            ("c", &["b", "z"]),
            ("z", &[]),
        ]);
        let graph = store.graph();
        let subset: BTreeSet<&str> = ["c", "b"].into_iter().collect();
        assert_eq!(graph.order_subset(&subset), vec!["b", "c"]);
    }
}
