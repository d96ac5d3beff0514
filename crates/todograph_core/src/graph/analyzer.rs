//! Critical path and earliest-start computation.
//!
//! # Responsibility
//! - Find the longest chain of dependency-linked tasks.
//! - Derive each task's earliest permissible start from its dependencies.
//!
//! # Invariants
//! - The critical path is root-to-sink ordered and at least as long as every
//!   other root-to-sink chain. Among equally long chains, the one reached
//!   first in ascending-root, adjacency-order depth-first search wins.
//! - Tasks without dependencies start at `now_ms`.
//! - Cyclic input returns `GraphError::CyclicDependency`.

use crate::graph::builder::build_graph;
use crate::graph::{ActivePath, DependencyGraph, GraphError, Visit};
use crate::model::todo::{Todo, TodoId};
use log::debug;
use std::collections::{BTreeMap, HashMap};

/// Read-side result computed fresh from one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriticalPathReport {
    /// Full task records along the longest chain, root first.
    pub critical_path: Vec<Todo>,
    /// Earliest start for every task, epoch milliseconds.
    pub earliest_start_dates: BTreeMap<TodoId, i64>,
}

/// Builds the graph from `todos` and runs both analyses.
pub fn analyze(todos: &[Todo], now_ms: i64) -> Result<CriticalPathReport, GraphError> {
    let graph = build_graph(todos);
    let by_id: HashMap<TodoId, &Todo> = todos.iter().map(|todo| (todo.id, todo)).collect();
    let due_dates: HashMap<TodoId, i64> = todos
        .iter()
        .filter_map(|todo| todo.due_at.map(|due| (todo.id, due)))
        .collect();

    let path = critical_path(&graph)?;
    let earliest_start_dates = earliest_start_dates(&graph, &due_dates, now_ms)?;
    debug!(
        "event=critical_path module=graph status=ok tasks={} path_len={}",
        graph.len(),
        path.len()
    );

    Ok(CriticalPathReport {
        critical_path: path
            .into_iter()
            .filter_map(|id| by_id.get(&id).map(|todo| (*todo).clone()))
            .collect(),
        earliest_start_dates,
    })
}

#[derive(Debug, Clone, Copy)]
struct Chain {
    len: usize,
    next: Option<TodoId>,
}

/// Returns the ids of the longest dependency chain, root first.
///
/// Every chain starting at a node is memoized, so the result matches an
/// exhaustive search from every root without its exponential cost on
/// diamond-shaped graphs.
pub fn critical_path(graph: &DependencyGraph) -> Result<Vec<TodoId>, GraphError> {
    let chains = longest_chains(graph)?;

    let mut best: Option<(TodoId, usize)> = None;
    for id in graph.ids() {
        let len = chains.get(&id).map_or(0, |chain| chain.len);
        if best.map_or(true, |(_, best_len)| len > best_len) {
            best = Some((id, len));
        }
    }

    let mut path = Vec::new();
    let mut cursor = best.map(|(id, _)| id);
    while let Some(id) = cursor {
        path.push(id);
        cursor = chains.get(&id).and_then(|chain| chain.next);
    }
    Ok(path)
}

fn longest_chains(graph: &DependencyGraph) -> Result<HashMap<TodoId, Chain>, GraphError> {
    let mut chains: HashMap<TodoId, Chain> = HashMap::with_capacity(graph.len());
    let mut active = ActivePath::default();

    for root in graph.ids() {
        let mut stack = vec![Visit::Enter(root)];
        while let Some(visit) = stack.pop() {
            match visit {
                Visit::Enter(id) => {
                    if chains.contains_key(&id) {
                        continue;
                    }
                    active
                        .enter(id)
                        .map_err(|path| GraphError::CyclicDependency { path })?;
                    stack.push(Visit::Exit(id));
                    for dependency in graph.dependencies(id).iter().rev() {
                        if !chains.contains_key(dependency) {
                            stack.push(Visit::Enter(*dependency));
                        }
                    }
                }
                Visit::Exit(id) => {
                    active.exit(id);
                    let mut chain = Chain { len: 1, next: None };
                    for dependency in graph.dependencies(id) {
                        let len = chains.get(dependency).map_or(1, |c| c.len) + 1;
                        if len > chain.len {
                            chain = Chain {
                                len,
                                next: Some(*dependency),
                            };
                        }
                    }
                    chains.insert(id, chain);
                }
            }
        }
    }

    Ok(chains)
}

/// Computes the earliest permissible start of every task in `graph`.
///
/// A task with dependencies starts at the latest of its dependencies' due
/// dates, substituting a dependency's own earliest start when it has no due
/// date. Results are memoized per id for the duration of the call.
pub fn earliest_start_dates(
    graph: &DependencyGraph,
    due_dates: &HashMap<TodoId, i64>,
    now_ms: i64,
) -> Result<BTreeMap<TodoId, i64>, GraphError> {
    let mut memo: HashMap<TodoId, i64> = HashMap::with_capacity(graph.len());
    let mut active = ActivePath::default();

    for root in graph.ids() {
        let mut stack = vec![Visit::Enter(root)];
        while let Some(visit) = stack.pop() {
            match visit {
                Visit::Enter(id) => {
                    if memo.contains_key(&id) {
                        continue;
                    }
                    active
                        .enter(id)
                        .map_err(|path| GraphError::CyclicDependency { path })?;
                    stack.push(Visit::Exit(id));
                    for dependency in graph.dependencies(id).iter().rev() {
                        if !due_dates.contains_key(dependency) && !memo.contains_key(dependency) {
                            stack.push(Visit::Enter(*dependency));
                        }
                    }
                }
                Visit::Exit(id) => {
                    active.exit(id);
                    let earliest = graph
                        .dependencies(id)
                        .iter()
                        .map(|dependency| {
                            due_dates
                                .get(dependency)
                                .or_else(|| memo.get(dependency))
                                .copied()
                                .unwrap_or(now_ms)
                        })
                        .max()
                        .unwrap_or(now_ms);
                    memo.insert(id, earliest);
                }
            }
        }
    }

    Ok(memo.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::{analyze, critical_path, earliest_start_dates};
    use crate::graph::{DependencyGraph, GraphError};
    use crate::model::todo::Todo;
    use std::collections::HashMap;

    const NOW: i64 = 1_700_000_000_000;
    const JAN_10_2024: i64 = 1_704_844_800_000;

    fn graph(edges: &[(i64, &[i64])]) -> DependencyGraph {
        edges
            .iter()
            .map(|(id, deps)| (*id, deps.to_vec()))
            .collect()
    }

    fn todo(id: i64, due_at: Option<i64>, dependencies: Vec<i64>) -> Todo {
        Todo {
            id,
            title: format!("task {id}"),
            due_at,
            image_url: None,
            created_at: 0,
            dependencies,
        }
    }

    /// Reference search: every root-to-sink path, first strictly longer wins.
    fn exhaustive_longest(graph: &DependencyGraph) -> Vec<i64> {
        fn dfs(graph: &DependencyGraph, id: i64, path: &mut Vec<i64>, best: &mut Vec<i64>) {
            path.push(id);
            let deps = graph.dependencies(id);
            if deps.is_empty() {
                if path.len() > best.len() {
                    *best = path.clone();
                }
            } else {
                for dep in deps {
                    dfs(graph, *dep, path, best);
                }
            }
            path.pop();
        }
        let mut best = Vec::new();
        for id in graph.ids() {
            dfs(graph, id, &mut Vec::new(), &mut best);
        }
        best
    }

    #[test]
    fn empty_graph_has_empty_path() {
        assert!(critical_path(&DependencyGraph::new()).unwrap().is_empty());
    }

    #[test]
    fn independent_tasks_yield_single_node_path_and_now() {
        let g = graph(&[(1, &[]), (2, &[]), (3, &[])]);
        assert_eq!(critical_path(&g).unwrap(), vec![1]);

        let dates = earliest_start_dates(&g, &HashMap::new(), NOW).unwrap();
        assert_eq!(dates.len(), 3);
        assert!(dates.values().all(|date| *date == NOW));
    }

    #[test]
    fn linear_chain_is_reported_root_to_sink() {
        let g = graph(&[(1, &[]), (2, &[1]), (3, &[2])]);
        assert_eq!(critical_path(&g).unwrap(), vec![3, 2, 1]);
    }

    #[test]
    fn ties_go_to_first_discovered_chain() {
        // 1 -> 3 -> 4 and 1 -> 2 -> 4 are equally long; 3 is listed first.
        let g = graph(&[(1, &[3, 2]), (2, &[4]), (3, &[4]), (4, &[])]);
        assert_eq!(critical_path(&g).unwrap(), vec![1, 3, 4]);
    }

    #[test]
    fn memoized_search_matches_exhaustive_search() {
        let cases = [
            graph(&[(1, &[2, 3]), (2, &[4]), (3, &[4, 5]), (4, &[]), (5, &[6]), (6, &[])]),
            graph(&[(1, &[]), (2, &[1]), (3, &[]), (4, &[3]), (5, &[4, 2])]),
            graph(&[(10, &[]), (3, &[10]), (7, &[3]), (1, &[10])]),
            graph(&[(1, &[2, 2]), (2, &[3]), (3, &[])]),
        ];
        for g in &cases {
            assert_eq!(critical_path(g).unwrap(), exhaustive_longest(g));
        }
    }

    #[test]
    fn earliest_start_propagates_through_chain() {
        let todos = vec![
            todo(1, Some(JAN_10_2024), vec![]),
            todo(2, None, vec![1]),
            todo(3, None, vec![2]),
        ];
        let report = analyze(&todos, NOW).unwrap();

        let path: Vec<i64> = report.critical_path.iter().map(|todo| todo.id).collect();
        assert_eq!(path, vec![3, 2, 1]);
        assert_eq!(report.earliest_start_dates[&1], NOW);
        assert_eq!(report.earliest_start_dates[&2], JAN_10_2024);
        assert_eq!(report.earliest_start_dates[&3], JAN_10_2024);
    }

    #[test]
    fn dependency_due_date_wins_over_its_own_earliest_start() {
        let todos = vec![
            todo(1, Some(JAN_10_2024), vec![]),
            todo(2, Some(JAN_10_2024 + 5), vec![1]),
            todo(3, None, vec![2]),
        ];
        let report = analyze(&todos, NOW).unwrap();
        assert_eq!(report.earliest_start_dates[&2], JAN_10_2024);
        assert_eq!(report.earliest_start_dates[&3], JAN_10_2024 + 5);
    }

    #[test]
    fn earliest_start_takes_latest_dependency() {
        let todos = vec![
            todo(1, Some(300), vec![]),
            todo(2, Some(100), vec![]),
            todo(3, None, vec![]),
            todo(4, None, vec![1, 2, 3]),
        ];
        let report = analyze(&todos, NOW).unwrap();
        // Task 3 has no due date and starts now, which is later than both.
        assert_eq!(report.earliest_start_dates[&4], NOW);

        let report = analyze(&todos[..2], NOW).unwrap();
        assert_eq!(report.earliest_start_dates.len(), 2);
    }

    #[test]
    fn deleted_dependency_is_ignored() {
        let todos = vec![todo(2, None, vec![1]), todo(3, None, vec![2])];
        let report = analyze(&todos, NOW).unwrap();
        let path: Vec<i64> = report.critical_path.iter().map(|todo| todo.id).collect();
        assert_eq!(path, vec![3, 2]);
        assert_eq!(report.earliest_start_dates[&2], NOW);
    }

    #[test]
    fn cyclic_graph_is_reported_not_looped() {
        let g = graph(&[(1, &[2]), (2, &[3]), (3, &[1])]);
        let err = critical_path(&g).unwrap_err();
        assert_eq!(
            err,
            GraphError::CyclicDependency {
                path: vec![1, 2, 3, 1]
            }
        );

        let err = earliest_start_dates(&g, &HashMap::new(), NOW).unwrap_err();
        assert!(matches!(err, GraphError::CyclicDependency { .. }));
    }

    #[test]
    fn self_loop_is_reported() {
        let g = graph(&[(1, &[1])]);
        assert!(critical_path(&g).is_err());
        assert!(earliest_start_dates(&g, &HashMap::new(), NOW).is_err());
    }

    #[test]
    fn recomputation_on_same_snapshot_is_identical() {
        let todos = vec![
            todo(1, Some(JAN_10_2024), vec![]),
            todo(2, None, vec![1]),
            todo(3, None, vec![1, 2]),
        ];
        assert_eq!(analyze(&todos, NOW).unwrap(), analyze(&todos, NOW).unwrap());
    }
}
