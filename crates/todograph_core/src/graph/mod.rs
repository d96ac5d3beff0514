//! Dependency graph computations over a task snapshot.
//!
//! # Responsibility
//! - Build adjacency from task records (`builder`).
//! - Compute the critical path and earliest-start dates (`analyzer`).
//! - Reject dependency writes that would close a cycle (`cycle_guard`).
//!
//! # Invariants
//! - All computations are scoped to one call; nothing is cached across calls.
//! - Traversals use an explicit stack with an active-path set, so cyclic
//!   input fails fast instead of recursing forever.

use crate::model::todo::{format_path, TodoId};
use std::collections::{BTreeMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod analyzer;
pub mod builder;
pub mod cycle_guard;

/// Adjacency from each task id to the ids it depends on.
///
/// Keys iterate in ascending id order, which fixes traversal order for
/// tie-breaking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    edges: BTreeMap<TodoId, Vec<TodoId>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `id`'s outgoing edges, replacing any previous ones.
    pub fn insert(&mut self, id: TodoId, dependencies: Vec<TodoId>) {
        self.edges.insert(id, dependencies);
    }

    /// Returns `id`'s dependencies; unknown ids are sinks.
    pub fn dependencies(&self, id: TodoId) -> &[TodoId] {
        self.edges.get(&id).map_or(&[], Vec::as_slice)
    }

    pub fn contains(&self, id: TodoId) -> bool {
        self.edges.contains_key(&id)
    }

    /// Task ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = TodoId> + '_ {
        self.edges.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Returns a copy with `id`'s edges replaced by `dependencies`.
    pub fn with_dependencies(&self, id: TodoId, dependencies: &[TodoId]) -> Self {
        let mut merged = self.clone();
        merged.insert(id, dependencies.to_vec());
        merged
    }
}

impl FromIterator<(TodoId, Vec<TodoId>)> for DependencyGraph {
    fn from_iter<T: IntoIterator<Item = (TodoId, Vec<TodoId>)>>(iter: T) -> Self {
        Self {
            edges: iter.into_iter().collect(),
        }
    }
}

/// Read-time graph failure. Persisted data should never trigger it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Traversal re-entered a task that is still being computed.
    CyclicDependency { path: Vec<TodoId> },
}

impl Display for GraphError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CyclicDependency { path } => {
                write!(f, "cyclic dependency in stored tasks: {}", format_path(path))
            }
        }
    }
}

impl Error for GraphError {}

/// Stack frame for explicit post-order traversal.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Visit {
    Enter(TodoId),
    Exit(TodoId),
}

/// Ids currently on the traversal path, in visiting order.
#[derive(Debug, Default)]
pub(crate) struct ActivePath {
    order: Vec<TodoId>,
    members: HashSet<TodoId>,
}

impl ActivePath {
    /// Pushes `id`, or returns the cycle it closes when already active.
    pub(crate) fn enter(&mut self, id: TodoId) -> Result<(), Vec<TodoId>> {
        if !self.members.insert(id) {
            return Err(self.cycle_through(id));
        }
        self.order.push(id);
        Ok(())
    }

    pub(crate) fn exit(&mut self, id: TodoId) {
        if self.order.last() == Some(&id) {
            self.order.pop();
        }
        self.members.remove(&id);
    }

    fn cycle_through(&self, id: TodoId) -> Vec<TodoId> {
        let start = self.order.iter().position(|active| *active == id).unwrap_or(0);
        let mut cycle = self.order[start..].to_vec();
        cycle.push(id);
        cycle
    }
}
