//! Write-time cycle detection for proposed dependency sets.
//!
//! # Invariants
//! - Only a node re-encountered on the active path is cyclic; diamond
//!   convergence is accepted.
//! - Self reference is reported before any traversal.

use crate::graph::{ActivePath, DependencyGraph, Visit};
use crate::model::todo::TodoId;
use std::collections::HashSet;

/// Returns the cycle that committing `candidate -> proposed` would close.
///
/// `graph` is the current persisted adjacency; `candidate`'s existing edges,
/// if any, are replaced by `proposed` before searching from `candidate`.
pub fn find_cycle(
    graph: &DependencyGraph,
    candidate: TodoId,
    proposed: &[TodoId],
) -> Option<Vec<TodoId>> {
    if proposed.contains(&candidate) {
        return Some(vec![candidate, candidate]);
    }

    let merged = graph.with_dependencies(candidate, proposed);
    let mut active = ActivePath::default();
    // Nodes whose reachable subgraph was fully explored without a cycle.
    let mut finished: HashSet<TodoId> = HashSet::new();
    let mut stack = vec![Visit::Enter(candidate)];

    while let Some(visit) = stack.pop() {
        match visit {
            Visit::Enter(id) => {
                if finished.contains(&id) {
                    continue;
                }
                if let Err(cycle) = active.enter(id) {
                    return Some(cycle);
                }
                stack.push(Visit::Exit(id));
                for dependency in merged.dependencies(id).iter().rev() {
                    stack.push(Visit::Enter(*dependency));
                }
            }
            Visit::Exit(id) => {
                active.exit(id);
                finished.insert(id);
            }
        }
    }

    None
}

/// Returns whether committing `candidate -> proposed` would create a cycle.
pub fn would_create_cycle(graph: &DependencyGraph, candidate: TodoId, proposed: &[TodoId]) -> bool {
    find_cycle(graph, candidate, proposed).is_some()
}

#[cfg(test)]
mod tests {
    use super::{find_cycle, would_create_cycle};
    use crate::graph::DependencyGraph;

    fn graph(edges: &[(i64, &[i64])]) -> DependencyGraph {
        edges
            .iter()
            .map(|(id, deps)| (*id, deps.to_vec()))
            .collect()
    }

    #[test]
    fn self_reference_is_rejected() {
        let g = graph(&[(1, &[])]);
        assert_eq!(find_cycle(&g, 2, &[1, 2]), Some(vec![2, 2]));
    }

    #[test]
    fn closing_edge_through_existing_graph_is_rejected() {
        // Existing: B(2) depends on A(1). Proposed: A depends on B.
        let g = graph(&[(1, &[]), (2, &[1])]);
        assert_eq!(find_cycle(&g, 1, &[2]), Some(vec![1, 2, 1]));
    }

    #[test]
    fn longer_cycle_is_reported_with_full_path() {
        let g = graph(&[(1, &[]), (2, &[1]), (3, &[2])]);
        assert_eq!(find_cycle(&g, 1, &[3]), Some(vec![1, 3, 2, 1]));
    }

    #[test]
    fn diamond_is_accepted() {
        // A(1) -> B(2), C(3); B, C -> D(4).
        let g = graph(&[(2, &[4]), (3, &[4]), (4, &[])]);
        assert!(!would_create_cycle(&g, 1, &[2, 3]));
    }

    #[test]
    fn new_task_without_dependencies_is_accepted() {
        let g = graph(&[(1, &[]), (2, &[1])]);
        assert!(!would_create_cycle(&g, 3, &[]));
    }

    #[test]
    fn dangling_reference_is_treated_as_sink() {
        let g = graph(&[(1, &[])]);
        assert!(!would_create_cycle(&g, 2, &[1, 99]));
    }

    #[test]
    fn cycle_not_through_candidate_is_still_reported() {
        let g = graph(&[(1, &[2]), (2, &[1])]);
        assert_eq!(find_cycle(&g, 3, &[1]), Some(vec![1, 2, 1]));
    }
}
