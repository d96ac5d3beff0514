//! HTTP routes for todo CRUD and the critical-path read model.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::{delete, get, put},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use todograph_core::{
    now_epoch_ms, DependencyRef, NewTodo, Todo, TodoDetails, TodoId, TodoValidationError,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/todos", get(list_todos).post(create_todo))
        .route("/api/todos/critical-path", get(critical_path))
        .route("/api/todos/{id}", delete(delete_todo))
        .route("/api/todos/{id}/dependencies", put(replace_dependencies))
        .with_state(state)
}

/// Create request; fields are loosely typed so shape errors become
/// validation errors instead of extractor rejections.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTodoRequest {
    pub title: Option<String>,
    pub due_date: Option<String>,
    pub dependencies: Option<Vec<Value>>,
}

impl CreateTodoRequest {
    fn into_new_todo(self) -> ApiResult<NewTodo> {
        let new_todo = NewTodo {
            title: self.title.unwrap_or_default().trim().to_string(),
            due_at: self.due_date.as_deref().map(parse_due_date).transpose()?.flatten(),
            dependencies: parse_dependency_ids(self.dependencies.unwrap_or_default())?,
        };
        new_todo.validate()?;
        Ok(new_todo)
    }
}

#[derive(Debug, Deserialize)]
pub struct ReplaceDependenciesRequest {
    pub dependencies: Vec<Value>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TodoResponse {
    pub id: TodoId,
    pub title: String,
    pub due_date: Option<DateTime<Utc>>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub is_overdue: bool,
    /// Stored references, including ones to deleted tasks.
    pub dependency_ids: Vec<TodoId>,
    /// Resolved dependencies; absent on critical-path items.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<DependencyRef>>,
}

impl TodoResponse {
    fn from_todo(todo: Todo, now_ms: i64) -> Self {
        Self {
            is_overdue: todo.is_overdue(now_ms),
            id: todo.id,
            title: todo.title,
            due_date: todo.due_at.and_then(DateTime::from_timestamp_millis),
            image_url: todo.image_url,
            created_at: DateTime::from_timestamp_millis(todo.created_at).unwrap_or_default(),
            dependency_ids: todo.dependencies,
            dependencies: None,
        }
    }

    fn from_details(details: TodoDetails, now_ms: i64) -> Self {
        Self {
            dependencies: Some(details.dependencies),
            ..Self::from_todo(details.todo, now_ms)
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CriticalPathResponse {
    pub critical_path: Vec<TodoResponse>,
    pub earliest_start_dates: BTreeMap<TodoId, DateTime<Utc>>,
}

async fn health() -> Json<Value> {
    Json(serde_json::json!({ "status": "ok", "version": todograph_core::core_version() }))
}

async fn list_todos(State(state): State<AppState>) -> ApiResult<Json<Vec<TodoResponse>>> {
    let todos = state.with_service(|service| service.list_todos()).await?;
    let now = now_epoch_ms();
    Ok(Json(
        todos
            .into_iter()
            .map(|details| TodoResponse::from_details(details, now))
            .collect(),
    ))
}

async fn create_todo(
    State(state): State<AppState>,
    payload: Result<Json<CreateTodoRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TodoResponse>)> {
    let Json(request) = payload.map_err(|rejection| ApiError::validation(rejection.body_text()))?;
    let new_todo = request.into_new_todo()?;

    // Resolved before entering the write path so its latency never holds the
    // database lock.
    let image_url = state.find_image(&new_todo.title).await;
    let details = state
        .with_service(move |service| service.create_todo(new_todo, image_url))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(TodoResponse::from_details(details, now_epoch_ms())),
    ))
}

async fn delete_todo(
    State(state): State<AppState>,
    id: Result<Path<TodoId>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = id.map_err(|rejection| ApiError::validation(rejection.body_text()))?;
    state
        .with_service(move |service| service.delete_todo(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn replace_dependencies(
    State(state): State<AppState>,
    id: Result<Path<TodoId>, PathRejection>,
    payload: Result<Json<ReplaceDependenciesRequest>, JsonRejection>,
) -> ApiResult<Json<TodoResponse>> {
    let Path(id) = id.map_err(|rejection| ApiError::validation(rejection.body_text()))?;
    let Json(request) = payload.map_err(|rejection| ApiError::validation(rejection.body_text()))?;
    let dependencies = parse_dependency_ids(request.dependencies)?;
    let details = state
        .with_service(move |service| service.replace_dependencies(id, &dependencies))
        .await?;
    Ok(Json(TodoResponse::from_details(details, now_epoch_ms())))
}

async fn critical_path(State(state): State<AppState>) -> ApiResult<Json<CriticalPathResponse>> {
    let report = state
        .with_service(|service| service.critical_path_report())
        .await?;
    let now = now_epoch_ms();

    Ok(Json(CriticalPathResponse {
        critical_path: report
            .critical_path
            .into_iter()
            .map(|todo| TodoResponse::from_todo(todo, now))
            .collect(),
        earliest_start_dates: report
            .earliest_start_dates
            .into_iter()
            .filter_map(|(id, ms)| DateTime::from_timestamp_millis(ms).map(|date| (id, date)))
            .collect(),
    }))
}

/// Parses RFC 3339 or `YYYY-MM-DD` (UTC midnight); blank means no due date.
pub fn parse_due_date(raw: &str) -> ApiResult<Option<i64>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(instant.timestamp_millis()));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| Some(midnight.and_utc().timestamp_millis()))
        .ok_or_else(|| ApiError::validation(format!("dueDate `{raw}` is not a valid date")))
}

/// Requires every dependency to be a JSON integer.
pub fn parse_dependency_ids(values: Vec<Value>) -> ApiResult<Vec<TodoId>> {
    values
        .into_iter()
        .map(|value| {
            value
                .as_i64()
                .ok_or_else(|| {
                    ApiError::from(TodoValidationError::InvalidDependencyId(value.to_string()))
                })
        })
        .collect()
}
