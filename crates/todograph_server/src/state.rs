//! Shared handler state.

use crate::error::{ApiError, ApiResult};
use crate::images::PexelsImageProvider;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use todograph_core::{ServiceResult, SqliteTodoRepository, TodoService, TodoServiceError};

/// State cloned into every handler.
///
/// The single connection sits behind a mutex, so dependency-graph writes are
/// serialized and each cycle check sees the graph it commits against.
#[derive(Clone)]
pub struct AppState {
    db: Arc<Mutex<Connection>>,
    images: Option<Arc<PexelsImageProvider>>,
}

impl AppState {
    pub fn new(conn: Connection, images: Option<PexelsImageProvider>) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
            images: images.map(Arc::new),
        }
    }

    /// Looks up an image for `title` when enrichment is configured.
    pub async fn find_image(&self, title: &str) -> Option<String> {
        match &self.images {
            Some(provider) => provider.find_image(title).await,
            None => None,
        }
    }

    /// Runs `work` against a service on the blocking pool.
    pub async fn with_service<T, F>(&self, work: F) -> ApiResult<T>
    where
        T: Send + 'static,
        F: for<'conn> FnOnce(&mut TodoService<SqliteTodoRepository<'conn>>) -> ServiceResult<T>
            + Send
            + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || -> ApiResult<T> {
            let mut conn = db
                .lock()
                .map_err(|_| ApiError::Upstream("database connection lock poisoned".to_string()))?;
            let repo = SqliteTodoRepository::try_new(&mut conn).map_err(TodoServiceError::from)?;
            let mut service = TodoService::new(repo);
            Ok(work(&mut service)?)
        })
        .await
        .map_err(|err| ApiError::Internal(format!("blocking task failed: {err}")))?
    }
}
