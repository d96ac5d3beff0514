//! Adjacency construction from a flat task snapshot.

use crate::graph::DependencyGraph;
use crate::model::todo::{Todo, TodoId};
use std::collections::HashSet;

/// Maps every task id to the ids it depends on.
///
/// Tasks without dependencies map to an empty list so traversals see them as
/// sinks. References to ids missing from `todos` are dropped. Duplicate
/// references are kept.
pub fn build_graph(todos: &[Todo]) -> DependencyGraph {
    let known: HashSet<TodoId> = todos.iter().map(|todo| todo.id).collect();

    todos
        .iter()
        .map(|todo| {
            let dependencies = todo
                .dependencies
                .iter()
                .copied()
                .filter(|dependency| known.contains(dependency))
                .collect();
            (todo.id, dependencies)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::build_graph;
    use crate::model::todo::Todo;

    fn todo(id: i64, dependencies: Vec<i64>) -> Todo {
        Todo {
            id,
            title: format!("task {id}"),
            due_at: None,
            image_url: None,
            created_at: 0,
            dependencies,
        }
    }

    #[test]
    fn every_task_appears_even_without_edges() {
        let graph = build_graph(&[todo(1, vec![]), todo(2, vec![1])]);
        assert_eq!(graph.len(), 2);
        assert!(graph.dependencies(1).is_empty());
        assert_eq!(graph.dependencies(2), &[1]);
    }

    #[test]
    fn dangling_references_contribute_no_edge() {
        let graph = build_graph(&[todo(1, vec![]), todo(2, vec![1, 99])]);
        assert_eq!(graph.dependencies(2), &[1]);
        assert!(!graph.contains(99));
    }

    #[test]
    fn duplicate_references_are_kept() {
        let graph = build_graph(&[todo(1, vec![]), todo(2, vec![1, 1])]);
        assert_eq!(graph.dependencies(2), &[1, 1]);
    }

    #[test]
    fn empty_snapshot_builds_empty_graph() {
        assert!(build_graph(&[]).is_empty());
    }
}
