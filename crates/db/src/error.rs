use aigc_core::error::CoreError;
use aigc_core::types::DbId;

/// Errors from a [`TaskStore`](crate::TaskStore) implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// `update` targeted a task that was never inserted.
    #[error("Task {0} does not exist")]
    NotFound(DbId),

    /// A stored row could not be turned back into a valid task.
    #[error("Corrupt task record: {0}")]
    Corrupt(String),
}

impl From<CoreError> for StoreError {
    fn from(err: CoreError) -> Self {
        StoreError::Corrupt(err.to_string())
    }
}
