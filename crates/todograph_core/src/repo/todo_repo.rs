//! Todo repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide create/read/delete APIs over `todos` and `todo_dependencies`.
//! - Own all-or-nothing creation: a task is never left persisted with a
//!   rejected dependency set.
//!
//! # Invariants
//! - Write paths run `find_cycle` against the graph read inside the write
//!   transaction.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::graph::builder::build_graph;
use crate::graph::cycle_guard::find_cycle;
use crate::model::todo::{DependencyRef, NewTodo, Todo, TodoId, TodoValidationError};
use log::{info, warn};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

const TODO_SELECT_SQL: &str = "SELECT
    id,
    title,
    due_at,
    image_url,
    created_at
FROM todos";

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for todo persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(TodoValidationError),
    Db(DbError),
    NotFound(TodoId),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "todo not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted todo data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<TodoValidationError> for RepoError {
    fn from(value: TodoValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for todo persistence.
pub trait TodoRepository {
    /// Creates one task with its dependencies atomically and returns its id.
    fn create_todo(
        &mut self,
        new_todo: &NewTodo,
        image_url: Option<&str>,
        now_ms: i64,
    ) -> RepoResult<TodoId>;
    /// Replaces all dependencies of an existing task atomically.
    fn replace_dependencies(&mut self, id: TodoId, dependencies: &[TodoId]) -> RepoResult<()>;
    fn get_todo(&self, id: TodoId) -> RepoResult<Option<Todo>>;
    /// Lists all tasks, newest first.
    fn list_todos(&self) -> RepoResult<Vec<Todo>>;
    /// Resolves a task's dependencies that still exist to `{id, title}`.
    fn list_dependency_refs(&self, id: TodoId) -> RepoResult<Vec<DependencyRef>>;
    /// Hard-deletes a task. Other tasks' references to it are left dangling.
    fn delete_todo(&mut self, id: TodoId) -> RepoResult<()>;
    /// Returns every task with its dependency ids for graph computation.
    fn load_snapshot(&self) -> RepoResult<Vec<Todo>>;
}

/// SQLite-backed todo repository.
pub struct SqliteTodoRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteTodoRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        let version = current_user_version(conn)?;
        if version != latest_version() {
            return Err(RepoError::InvalidData(format!(
                "connection schema version {version} does not match expected {}",
                latest_version()
            )));
        }
        Ok(Self { conn })
    }
}

impl TodoRepository for SqliteTodoRepository<'_> {
    fn create_todo(
        &mut self,
        new_todo: &NewTodo,
        image_url: Option<&str>,
        now_ms: i64,
    ) -> RepoResult<TodoId> {
        new_todo.validate()?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO todos (title, due_at, image_url, created_at)
             VALUES (?1, ?2, ?3, ?4);",
            params![new_todo.title.trim(), new_todo.due_at, image_url, now_ms],
        )?;
        let id = tx.last_insert_rowid();

        // Rejection returns before commit; dropping `tx` rolls the row back.
        if let Err(err) = guard_dependencies(&tx, id, &new_todo.dependencies) {
            warn!(
                "event=todo_create module=repo status=rejected todo_id={id} deps={} reason={err}",
                new_todo.dependencies.len()
            );
            return Err(err);
        }
        insert_dependencies(&tx, id, &new_todo.dependencies)?;
        tx.commit()?;

        info!(
            "event=todo_create module=repo status=ok todo_id={id} deps={}",
            new_todo.dependencies.len()
        );
        Ok(id)
    }

    fn replace_dependencies(&mut self, id: TodoId, dependencies: &[TodoId]) -> RepoResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        if !todo_exists(&tx, id)? {
            return Err(RepoError::NotFound(id));
        }

        if let Err(err) = guard_dependencies(&tx, id, dependencies) {
            warn!(
                "event=todo_set_deps module=repo status=rejected todo_id={id} deps={} reason={err}",
                dependencies.len()
            );
            return Err(err);
        }
        tx.execute("DELETE FROM todo_dependencies WHERE todo_id = ?1;", [id])?;
        insert_dependencies(&tx, id, dependencies)?;
        tx.commit()?;

        info!(
            "event=todo_set_deps module=repo status=ok todo_id={id} deps={}",
            dependencies.len()
        );
        Ok(())
    }

    fn get_todo(&self, id: TodoId) -> RepoResult<Option<Todo>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TODO_SELECT_SQL} WHERE id = ?1;"))?;
        let Some(mut todo) = stmt
            .query_row([id], parse_todo_row)
            .optional()?
        else {
            return Ok(None);
        };

        todo.dependencies = load_dependency_ids(self.conn, id)?;
        validate_persisted(&todo)?;
        Ok(Some(todo))
    }

    fn list_todos(&self) -> RepoResult<Vec<Todo>> {
        let mut todos = load_todos(
            self.conn,
            &format!("{TODO_SELECT_SQL} ORDER BY created_at DESC, id DESC;"),
        )?;
        attach_dependencies(self.conn, &mut todos)?;
        Ok(todos)
    }

    fn list_dependency_refs(&self, id: TodoId) -> RepoResult<Vec<DependencyRef>> {
        let mut stmt = self.conn.prepare(
            "SELECT t.id, t.title
             FROM todo_dependencies d
             INNER JOIN todos t ON t.id = d.depends_on_id
             WHERE d.todo_id = ?1
             ORDER BY t.id ASC;",
        )?;
        let refs = stmt
            .query_map([id], |row| {
                Ok(DependencyRef {
                    id: row.get("id")?,
                    title: row.get("title")?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(refs)
    }

    fn delete_todo(&mut self, id: TodoId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM todos WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        info!("event=todo_delete module=repo status=ok todo_id={id}");
        Ok(())
    }

    fn load_snapshot(&self) -> RepoResult<Vec<Todo>> {
        let mut todos = load_todos(self.conn, &format!("{TODO_SELECT_SQL} ORDER BY id ASC;"))?;
        attach_dependencies(self.conn, &mut todos)?;
        Ok(todos)
    }
}

/// Validates a proposed dependency set for `id` against the current graph.
///
/// Order: self reference, unknown ids, then cycles through existing edges.
fn guard_dependencies(tx: &Transaction<'_>, id: TodoId, dependencies: &[TodoId]) -> RepoResult<()> {
    if dependencies.contains(&id) {
        return Err(TodoValidationError::SelfDependency(id).into());
    }
    for dependency in dependencies {
        if !todo_exists(tx, *dependency)? {
            return Err(TodoValidationError::UnknownDependency(*dependency).into());
        }
    }

    let mut snapshot = load_todos(tx, &format!("{TODO_SELECT_SQL} ORDER BY id ASC;"))?;
    attach_dependencies(tx, &mut snapshot)?;
    if let Some(cycle) = find_cycle(&build_graph(&snapshot), id, dependencies) {
        return Err(TodoValidationError::CyclicDependency(cycle).into());
    }
    Ok(())
}

fn insert_dependencies(tx: &Transaction<'_>, id: TodoId, dependencies: &[TodoId]) -> RepoResult<()> {
    let mut stmt = tx.prepare(
        "INSERT OR IGNORE INTO todo_dependencies (todo_id, depends_on_id) VALUES (?1, ?2);",
    )?;
    for dependency in dependencies {
        stmt.execute(params![id, dependency])?;
    }
    Ok(())
}

fn todo_exists(conn: &Connection, id: TodoId) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM todos WHERE id = ?1);",
        [id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn load_todos(conn: &Connection, sql: &str) -> RepoResult<Vec<Todo>> {
    let mut stmt = conn.prepare(sql)?;
    let todos = stmt
        .query_map([], parse_todo_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(todos)
}

/// Fills `dependencies` for every task with one query over the edge table.
fn attach_dependencies(conn: &Connection, todos: &mut [Todo]) -> RepoResult<()> {
    let mut edges: HashMap<TodoId, Vec<TodoId>> = HashMap::new();
    let mut stmt = conn.prepare(
        "SELECT todo_id, depends_on_id
         FROM todo_dependencies
         ORDER BY todo_id ASC, depends_on_id ASC;",
    )?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let todo_id: TodoId = row.get(0)?;
        let depends_on: TodoId = row.get(1)?;
        edges.entry(todo_id).or_default().push(depends_on);
    }

    for todo in todos.iter_mut() {
        todo.dependencies = edges.remove(&todo.id).unwrap_or_default();
        validate_persisted(todo)?;
    }
    Ok(())
}

fn validate_persisted(todo: &Todo) -> RepoResult<()> {
    todo.validate().map_err(|err| {
        RepoError::InvalidData(format!("todo {} failed validation: {err}", todo.id))
    })
}

fn load_dependency_ids(conn: &Connection, id: TodoId) -> RepoResult<Vec<TodoId>> {
    let mut stmt = conn.prepare(
        "SELECT depends_on_id
         FROM todo_dependencies
         WHERE todo_id = ?1
         ORDER BY depends_on_id ASC;",
    )?;
    let ids = stmt
        .query_map([id], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}

fn parse_todo_row(row: &Row<'_>) -> rusqlite::Result<Todo> {
    Ok(Todo {
        id: row.get("id")?,
        title: row.get("title")?,
        due_at: row.get("due_at")?,
        image_url: row.get("image_url")?,
        created_at: row.get("created_at")?,
        dependencies: Vec::new(),
    })
}
