//! Core domain logic for todograph.
//! This crate is the single source of truth for task and dependency invariants.

pub mod db;
pub mod graph;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use graph::analyzer::{analyze, critical_path, earliest_start_dates, CriticalPathReport};
pub use graph::builder::build_graph;
pub use graph::cycle_guard::{find_cycle, would_create_cycle};
pub use graph::{DependencyGraph, GraphError};
pub use logging::{default_log_level, init_logging, logging_status, LoggingConfig, LoggingError};
pub use model::todo::{DependencyRef, NewTodo, Todo, TodoId, TodoValidationError};
pub use repo::todo_repo::{RepoError, RepoResult, SqliteTodoRepository, TodoRepository};
pub use service::todo_service::{
    now_epoch_ms, ServiceResult, TodoDetails, TodoService, TodoServiceError,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
