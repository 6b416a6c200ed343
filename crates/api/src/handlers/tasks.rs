//! Handlers for the `/tasks` resource.
//!
//! Every endpoint acts on behalf of the caller identified by [`OwnerId`];
//! callers only ever see their own tasks.

use aigc_core::error::CoreError;
use aigc_core::state_machine::TaskStatus;
use aigc_core::task::{CreateTask, Task};
use aigc_core::types::DbId;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::owner::OwnerId;
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for `GET /tasks`.
#[derive(Debug, Default, Deserialize)]
pub struct TaskListQuery {
    pub kind: Option<String>,
}

/// Body of a successful create.
#[derive(Debug, Serialize)]
pub struct CreatedTaskResponse {
    pub task_id: DbId,
    pub status: TaskStatus,
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

/// POST /api/v1/tasks
///
/// Returns 201 with the new task id once the task is accepted. When the
/// dispatcher is saturated the request is held until the task has run;
/// this route carries no request timeout for that reason.
pub async fn create_task(
    State(state): State<AppState>,
    owner: OwnerId,
    Json(mut input): Json<CreateTask>,
) -> AppResult<impl IntoResponse> {
    input.owner_id = owner.0;

    // Run detached so a request timeout cannot abandon a caller-run task
    // halfway through.
    let service = state.tasks.clone();
    let created = tokio::spawn(async move { service.create_task(input).await })
        .await
        .map_err(|e| AppError::InternalError(format!("Task submission aborted: {e}")))??;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: CreatedTaskResponse {
                task_id: created.task_id,
                status: created.task.status(),
            },
        }),
    ))
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// GET /api/v1/tasks?kind=
pub async fn list_tasks(
    State(state): State<AppState>,
    owner: OwnerId,
    Query(params): Query<TaskListQuery>,
) -> AppResult<Json<DataResponse<Vec<Task>>>> {
    let tasks = state
        .tasks
        .list_tasks(&owner.0, params.kind.as_deref())
        .await?;
    Ok(Json(DataResponse { data: tasks }))
}

/// GET /api/v1/tasks/{id}
pub async fn get_task(
    State(state): State<AppState>,
    owner: OwnerId,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Task>>> {
    let task = state.tasks.get_task(id).await?;
    if task.owner_id() != owner.0 {
        return Err(AppError::Core(CoreError::Forbidden(
            "Cannot view another user's task".into(),
        )));
    }
    Ok(Json(DataResponse { data: task }))
}
