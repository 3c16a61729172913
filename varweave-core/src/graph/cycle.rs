//! Cycle Detection
//!
//! Depth-first search with an explicit recursion stack. A back-edge (an edge
//! to a node that is still on the stack) closes a cycle. The search is
//! iterative so deep chains cannot overflow the native stack.

use std::collections::HashMap;

use smallvec::SmallVec;

use super::dependency::DependencyGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    OnStack,
    Done,
}

impl<'a> DependencyGraph<'a> {
    /// Would replacing `candidate`'s dependency list with `candidate_deps`
    /// introduce a cycle?
    ///
    /// Must return false before any dependency edit is committed.
    pub fn would_create_cycle(&self, candidate: &str, candidate_deps: &[String]) -> bool {
        self.find_cycle(candidate, candidate_deps).is_some()
    }

    /// Like `would_create_cycle`, but returns the offending cycle.
    ///
    /// The path starts and ends with the same name, e.g. `[a, c, b, a]`.
    pub fn find_cycle<'n>(
        &'n self,
        candidate: &'n str,
        candidate_deps: &'n [String],
    ) -> Option<Vec<String>> {
        let roots = std::iter::once(candidate)
            .chain(self.edges.keys().map(|name| -> &'n str { *name }));
        detect_cycle(roots, |node: &'n str| -> &'n [String] {
            if node == candidate {
                candidate_deps
            } else {
                self.dependencies_of(node)
            }
        })
    }

    /// Search the snapshot as-is for any cycle.
    pub fn find_any_cycle(&self) -> Option<Vec<String>> {
        detect_cycle(self.edges.keys().copied(), |node| self.dependencies_of(node))
    }
}

fn detect_cycle<'n, R, F>(roots: R, deps_of: F) -> Option<Vec<String>>
where
    R: IntoIterator<Item = &'n str>,
    F: Fn(&'n str) -> &'n [String],
{
    let mut state: HashMap<&'n str, Visit> = HashMap::new();

    for root in roots {
        if state.contains_key(root) {
            continue;
        }

        // (node, index of the next dependency to visit)
        let mut stack: SmallVec<[(&'n str, usize); 16]> = SmallVec::new();
        stack.push((root, 0));
        state.insert(root, Visit::OnStack);

        while let Some(frame) = stack.last_mut() {
            let (node, next) = *frame;
            let deps = deps_of(node);

            if next == deps.len() {
                state.insert(node, Visit::Done);
                stack.pop();
                continue;
            }

            frame.1 += 1;
            let dep = deps[next].as_str();
            match state.get(dep) {
                Some(Visit::OnStack) => {
                    let start = stack
                        .iter()
                        .position(|(n, _)| *n == dep)
                        .unwrap_or_default();
                    let mut path: Vec<String> =
                        stack[start..].iter().map(|(n, _)| n.to_string()).collect();
                    path.push(dep.to_string());
                    return Some(path);
                }
                Some(Visit::Done) => {}
                None => {
                    state.insert(dep, Visit::OnStack);
                    stack.push((dep, 0));
                }
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use crate::variable::{Variable, VariableStore};

    fn store(edges: &[(&str, &[&str])]) -> VariableStore {
        let mut store = VariableStore::new();
        for (name, deps) in edges {
            store.upsert(Variable::new(*name).with_dependencies(deps.iter().copied()));
        }
        store
    }

    fn deps(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn acyclic_edits_are_accepted() {
        let store = store(&[("a", &[]), ("b", &["a"]), ("c", &["b"]), ("d", &[])]);
        let graph = store.graph();

        assert!(!graph.would_create_cycle("d", &deps(&["a", "b", "c"])));
        assert!(!graph.would_create_cycle("c", &deps(&["a", "b"])));
        assert!(!graph.would_create_cycle("a", &[]));
        assert!(graph.find_any_cycle().is_none());
    }

    #[test]
    fn back_edge_to_ancestor_is_rejected() {
        let store = store(&[("a", &[]), ("b", &["a"]), ("c", &["b"])]);
        let graph = store.graph();

        assert!(graph.would_create_cycle("a", &deps(&["c"])));
        assert!(graph.would_create_cycle("a", &deps(&["b"])));
        assert!(graph.would_create_cycle("b", &deps(&["c"])));
    }

    #[test]
    fn cycle_path_is_reported() {
        let store = store(&[("a", &[]), ("b", &["a"]), ("c", &["b"])]);
        let path = store.graph().find_cycle("a", &deps(&["c"])).unwrap();
        assert_eq!(path, deps(&["a", "c", "b", "a"]));
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let store = store(&[("a", &[])]);
        let path = store.graph().find_cycle("a", &deps(&["a"])).unwrap();
        assert_eq!(path, deps(&["a", "a"]));
    }

    #[test]
    fn unknown_candidate_is_treated_as_new_node() {
        let store = store(&[("a", &[]), ("b", &["a"])]);
        let graph = store.graph();
        assert!(!graph.would_create_cycle("fresh", &deps(&["a", "b"])));
    }

    #[test]
    fn finds_existing_cycle() {
        let store = store(&[("x", &[]), ("a", &["b"]), ("b", &["a"])]);
        let path = store.graph().find_any_cycle().unwrap();
        assert_eq!(path, deps(&["a", "b", "a"]));
    }

    #[test]
    fn deep_chain_does_not_overflow() {
        let mut store = VariableStore::new();
        store.upsert(Variable::new("v0"));
        for i in 1..20_000 {
            store.upsert(Variable::new(format!("v{i}")).with_dependencies([format!("v{}", i - 1)]));
        }
        let graph = store.graph();
        assert!(graph.would_create_cycle("v0", &deps(&["v19999"])));
        assert!(!graph.would_create_cycle("v19999", &deps(&["v0"])));
    }
}
