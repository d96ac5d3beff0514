//! HTTP surface for todograph.
//!
//! # Responsibility
//! - Expose task CRUD and the critical-path read model as JSON endpoints.
//! - Keep request parsing and status mapping out of core.

pub mod config;
pub mod error;
pub mod images;
pub mod routes;
pub mod state;

pub use config::{ConfigError, ServerConfig};
pub use error::{ApiError, ApiResult};
pub use images::PexelsImageProvider;
pub use routes::router;
pub use state::AppState;
