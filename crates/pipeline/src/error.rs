use aigc_core::error::CoreError;
use aigc_db::StoreError;

/// Errors returned by [`TaskService`](crate::TaskService) operations.
///
/// Provider faults never show up here; they are recorded on the task.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
