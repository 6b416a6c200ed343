pub mod health;
pub mod tasks;

use axum::Router;
use tower_http::timeout::TimeoutLayer;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /tasks                                           list, create
/// /tasks/{id}                                      get
/// ```
///
/// `timeout` bounds every read; see [`tasks::router`] for the exception.
pub fn api_routes(timeout: TimeoutLayer) -> Router<AppState> {
    Router::new().nest("/tasks", tasks::router(timeout))
}
