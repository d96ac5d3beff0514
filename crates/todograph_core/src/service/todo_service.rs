//! Todo use-case service.
//!
//! # Responsibility
//! - Provide create/list/delete entry points and the critical-path read model.
//! - Classify failures into user-correctable, integrity and upstream errors.
//!
//! # Invariants
//! - The critical-path report is recomputed from a fresh snapshot on every
//!   call.
//! - Validation failures are detected before or inside the write transaction,
//!   never after commit.

use crate::graph::analyzer::{analyze, CriticalPathReport};
use crate::graph::GraphError;
use crate::model::todo::{DependencyRef, NewTodo, Todo, TodoId, TodoValidationError};
use crate::repo::todo_repo::{RepoError, TodoRepository};
use log::{error, info};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Service error for todo use-cases.
#[derive(Debug)]
pub enum TodoServiceError {
    /// User-correctable input problem, including rejected cycles.
    Validation(TodoValidationError),
    /// Target task does not exist.
    NotFound(TodoId),
    /// Stored graph violates the acyclic invariant.
    Integrity(GraphError),
    /// Persistence-layer failure.
    Repo(RepoError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl TodoServiceError {
    /// Stable machine-readable category for callers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(
                TodoValidationError::CyclicDependency(_) | TodoValidationError::SelfDependency(_),
            ) => "CYCLIC_DEPENDENCY",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Integrity(_) | Self::Repo(RepoError::InvalidData(_)) => "DATA_INTEGRITY",
            Self::Repo(_) => "UPSTREAM_UNAVAILABLE",
            Self::InconsistentState(_) => "INCONSISTENT_STATE",
        }
    }

    /// Returns whether the caller can fix the request and retry.
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::NotFound(_))
    }
}

impl Display for TodoServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "todo not found: {id}"),
            Self::Integrity(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent todo state: {details}"),
        }
    }
}

impl Error for TodoServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Integrity(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for TodoServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound(id) => Self::NotFound(id),
            other => Self::Repo(other),
        }
    }
}

impl From<TodoValidationError> for TodoServiceError {
    fn from(value: TodoValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<GraphError> for TodoServiceError {
    fn from(value: GraphError) -> Self {
        Self::Integrity(value)
    }
}

pub type ServiceResult<T> = Result<T, TodoServiceError>;

/// Task together with its dependencies that still exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoDetails {
    pub todo: Todo,
    pub dependencies: Vec<DependencyRef>,
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
}

/// Todo service facade over repository implementations.
pub struct TodoService<R: TodoRepository> {
    repo: R,
    clock: fn() -> i64,
}

impl<R: TodoRepository> TodoService<R> {
    /// Creates a service using the provided repository and the system clock.
    pub fn new(repo: R) -> Self {
        Self::with_clock(repo, now_epoch_ms)
    }

    /// Creates a service with an explicit clock, used for deterministic tests.
    pub fn with_clock(repo: R, clock: fn() -> i64) -> Self {
        Self { repo, clock }
    }

    /// Current time according to this service's clock.
    pub fn now(&self) -> i64 {
        (self.clock)()
    }

    /// Creates one task and returns it with its resolved dependencies.
    ///
    /// # Contract
    /// - Title must be non-empty after trimming; it is stored trimmed.
    /// - Every dependency must exist; self reference and cycles are rejected.
    /// - On any rejection nothing is persisted.
    /// - `image_url` is opaque enrichment and is stored as given.
    pub fn create_todo(
        &mut self,
        new_todo: NewTodo,
        image_url: Option<String>,
    ) -> ServiceResult<TodoDetails> {
        new_todo.validate()?;
        let id = self
            .repo
            .create_todo(&new_todo, image_url.as_deref(), self.now())?;
        match self.details(id) {
            Err(TodoServiceError::NotFound(_)) => Err(TodoServiceError::InconsistentState(
                "created todo not found in read-back",
            )),
            other => other,
        }
    }

    /// Replaces a task's dependency set under the same guard as creation.
    pub fn replace_dependencies(
        &mut self,
        id: TodoId,
        dependencies: &[TodoId],
    ) -> ServiceResult<TodoDetails> {
        self.repo.replace_dependencies(id, dependencies)?;
        self.details(id)
    }

    /// Gets one task with resolved dependencies.
    pub fn get_todo(&self, id: TodoId) -> ServiceResult<TodoDetails> {
        self.details(id)
    }

    /// Lists all tasks newest first, each with resolved dependencies.
    pub fn list_todos(&self) -> ServiceResult<Vec<TodoDetails>> {
        let todos = self.repo.list_todos()?;
        let titles: HashMap<TodoId, String> = todos
            .iter()
            .map(|todo| (todo.id, todo.title.clone()))
            .collect();

        Ok(todos
            .into_iter()
            .map(|todo| {
                let dependencies = todo
                    .dependencies
                    .iter()
                    .filter_map(|id| {
                        titles.get(id).map(|title| DependencyRef {
                            id: *id,
                            title: title.clone(),
                        })
                    })
                    .collect();
                TodoDetails { todo, dependencies }
            })
            .collect())
    }

    /// Hard-deletes a task.
    pub fn delete_todo(&mut self, id: TodoId) -> ServiceResult<()> {
        self.repo.delete_todo(id)?;
        Ok(())
    }

    /// Computes the critical path and earliest-start dates from current data.
    pub fn critical_path_report(&self) -> ServiceResult<CriticalPathReport> {
        let started_at = Instant::now();
        let todos = self.repo.load_snapshot()?;

        match analyze(&todos, self.now()) {
            Ok(report) => {
                info!(
                    "event=critical_path module=service status=ok tasks={} path_len={} duration_ms={}",
                    todos.len(),
                    report.critical_path.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(report)
            }
            Err(err) => {
                error!(
                    "event=critical_path module=service status=error tasks={} error_code=data_integrity error={}",
                    todos.len(),
                    err
                );
                Err(err.into())
            }
        }
    }

    fn details(&self, id: TodoId) -> ServiceResult<TodoDetails> {
        let todo = self
            .repo
            .get_todo(id)?
            .ok_or(TodoServiceError::NotFound(id))?;
        let dependencies = self.repo.list_dependency_refs(id)?;
        Ok(TodoDetails { todo, dependencies })
    }
}
