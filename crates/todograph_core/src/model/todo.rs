//! Todo domain model.
//!
//! # Responsibility
//! - Define the persisted task record and the write-side creation request.
//! - Provide validation errors for user-correctable input problems.
//!
//! # Invariants
//! - `title` is non-empty after trimming.
//! - `dependencies` never contains the task's own id once persisted.
//! - All instants are Unix epoch milliseconds.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Storage-assigned task identifier.
pub type TodoId = i64;

/// Canonical task record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: TodoId,
    /// Trimmed, non-empty title.
    pub title: String,
    /// Optional due date in epoch milliseconds.
    pub due_at: Option<i64>,
    /// Opaque image URL, never interpreted by core.
    pub image_url: Option<String>,
    /// Creation time in epoch milliseconds.
    pub created_at: i64,
    /// Ids this task depends on, ascending. May reference deleted tasks.
    pub dependencies: Vec<TodoId>,
}

impl Todo {
    /// Returns whether the due date has already passed at `now_ms`.
    pub fn is_overdue(&self, now_ms: i64) -> bool {
        self.due_at.is_some_and(|due| due < now_ms)
    }

    /// Validates invariants that must hold for persisted rows.
    pub fn validate(&self) -> Result<(), TodoValidationError> {
        if self.title.trim().is_empty() {
            return Err(TodoValidationError::EmptyTitle);
        }
        if self.dependencies.contains(&self.id) {
            return Err(TodoValidationError::SelfDependency(self.id));
        }
        Ok(())
    }
}

/// Resolved dependency shown alongside a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyRef {
    pub id: TodoId,
    pub title: String,
}

/// Write-side request for creating one task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTodo {
    pub title: String,
    pub due_at: Option<i64>,
    pub dependencies: Vec<TodoId>,
}

impl NewTodo {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn due_at(mut self, due_at: i64) -> Self {
        self.due_at = Some(due_at);
        self
    }

    pub fn depends_on(mut self, dependencies: impl IntoIterator<Item = TodoId>) -> Self {
        self.dependencies.extend(dependencies);
        self
    }

    /// Checks input shape before any storage access.
    ///
    /// Dependency existence, self reference and cycles need the assigned id
    /// and the current graph, so they are checked by the repository.
    pub fn validate(&self) -> Result<(), TodoValidationError> {
        if self.title.trim().is_empty() {
            return Err(TodoValidationError::EmptyTitle);
        }
        Ok(())
    }
}

/// User-correctable input errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TodoValidationError {
    /// Title missing or whitespace only.
    EmptyTitle,
    /// Dependency input that is not an integer id.
    InvalidDependencyId(String),
    /// Task lists itself as a dependency.
    SelfDependency(TodoId),
    /// Dependency id does not resolve to an existing task.
    UnknownDependency(TodoId),
    /// Proposed edges would close a cycle; carries the closing path.
    CyclicDependency(Vec<TodoId>),
}

impl Display for TodoValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "title is required"),
            Self::InvalidDependencyId(value) => {
                write!(f, "dependency `{value}` is not a valid todo id")
            }
            Self::SelfDependency(id) => write!(f, "todo {id} cannot depend on itself"),
            Self::UnknownDependency(id) => write!(f, "dependency {id} does not exist"),
            Self::CyclicDependency(path) => {
                write!(f, "circular dependency detected: {}", format_path(path))
            }
        }
    }
}

impl Error for TodoValidationError {}

/// Renders an id chain as `1 -> 2 -> 3`.
pub fn format_path(path: &[TodoId]) -> String {
    path.iter()
        .map(TodoId::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::{NewTodo, Todo, TodoValidationError};

    fn todo(id: i64, due_at: Option<i64>) -> Todo {
        Todo {
            id,
            title: format!("task {id}"),
            due_at,
            image_url: None,
            created_at: 0,
            dependencies: Vec::new(),
        }
    }

    #[test]
    fn whitespace_title_is_rejected() {
        let err = NewTodo::new("   \t").validate().unwrap_err();
        assert_eq!(err, TodoValidationError::EmptyTitle);
    }

    #[test]
    fn overdue_requires_due_date_in_the_past() {
        assert!(todo(1, Some(100)).is_overdue(101));
        assert!(!todo(1, Some(100)).is_overdue(100));
        assert!(!todo(1, None).is_overdue(i64::MAX));
    }

    #[test]
    fn persisted_self_reference_fails_validation() {
        let mut record = todo(7, None);
        record.dependencies = vec![3, 7];
        assert_eq!(
            record.validate().unwrap_err(),
            TodoValidationError::SelfDependency(7)
        );
    }

    #[test]
    fn cyclic_error_renders_path() {
        let err = TodoValidationError::CyclicDependency(vec![1, 2, 1]);
        assert_eq!(err.to_string(), "circular dependency detected: 1 -> 2 -> 1");
    }
}
