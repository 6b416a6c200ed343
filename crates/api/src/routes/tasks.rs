//! Route definitions for the `/tasks` resource.

use axum::routing::get;
use axum::Router;
use tower_http::timeout::TimeoutLayer;

use crate::handlers::tasks;
use crate::state::AppState;

/// Routes mounted at `/tasks`.
///
/// ```text
/// GET    /                -> list_tasks
/// POST   /                -> create_task
/// GET    /{id}            -> get_task
/// ```
///
/// `timeout` wraps the GET handlers only. POST is added after the layer so
/// a create that runs on the caller always returns the new task id.
pub fn router(timeout: TimeoutLayer) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(tasks::list_tasks)
                .layer(timeout.clone())
                .post(tasks::create_task),
        )
        .route("/{id}", get(tasks::get_task).layer(timeout))
}
