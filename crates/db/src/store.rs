use aigc_core::task::{NewTask, Task, TaskKind};
use aigc_core::types::DbId;
use async_trait::async_trait;

use crate::error::StoreError;

/// Keyed store of task records.
///
/// The dispatcher is the only writer of an existing record, and it writes
/// one task from one worker at a time. Implementations must make each
/// `update` visible atomically so readers never see a half-written task.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Persist a validated task in `Pending` state and return the stored
    /// record with its assigned id.
    async fn insert(&self, new: &NewTask) -> Result<Task, StoreError>;

    /// Replace the whole record keyed by `task.id()`. Idempotent.
    async fn update(&self, task: &Task) -> Result<(), StoreError>;

    /// Fetch one task.
    async fn find_by_id(&self, id: DbId) -> Result<Option<Task>, StoreError>;

    /// All tasks of one owner, newest first, optionally filtered by kind.
    async fn find_by_owner(
        &self,
        owner_id: &str,
        kind: Option<TaskKind>,
    ) -> Result<Vec<Task>, StoreError>;
}
