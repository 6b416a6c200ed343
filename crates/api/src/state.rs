use std::sync::Arc;

use aigc_pipeline::TaskService;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheap to clone: every field is behind an `Arc` or is itself a handle.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Task submission and query service.
    pub tasks: TaskService,
    /// Database pool when running against Postgres; `None` with the
    /// in-memory store.
    pub pool: Option<aigc_db::DbPool>,
}
