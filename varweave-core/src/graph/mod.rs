//! Dependency Graph
//!
//! This module implements the pure graph queries the engine relies on:
//! cycle detection, topological ordering and dependent lookups.
//!
//! # Overview
//!
//! The graph is a snapshot of the store's edges taken at call time:
//!
//! - Nodes are variable names
//! - Edges point from a dependent to each of its dependencies
//!
//! A variable with no dependencies is ready first. When a value changes we
//! walk the reverse edges to find everything downstream of it, then order
//! that subset using the global topological order.
//!
//! # Design Decisions
//!
//! 1. The snapshot borrows names from the store instead of copying them, so
//!    taking one is cheap enough to do on every query.
//!
//! 2. Both forward (dependencies) and reverse (dependents) adjacency are
//!    built once per snapshot, making both traversal directions O(V+E).
//!
//! 3. Ties in the topological order are broken lexicographically. The same
//!    graph always yields the same order, across runs and processes.

mod cycle;
mod dependency;
mod order;

pub use dependency::DependencyGraph;
