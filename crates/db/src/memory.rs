//! In-process task store.
//!
//! Records live in a `HashMap` behind a [`tokio::sync::RwLock`]; every
//! write replaces the whole record under the write lock, so readers always
//! get a consistent snapshot. Ids come from a monotonic counter starting
//! at 1. Nothing survives a restart.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use aigc_core::task::{NewTask, Task, TaskKind};
use aigc_core::types::DbId;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::store::TaskStore;

/// Task store held entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<DbId, Task>>,
    next_id: AtomicI64,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tasks.
    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn insert(&self, new: &NewTask) -> Result<Task, StoreError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let task = Task::new_pending(id, new.clone(), Utc::now());
        self.tasks.write().await.insert(id, task.clone());
        Ok(task)
    }

    async fn update(&self, task: &Task) -> Result<(), StoreError> {
        let mut tasks = self.tasks.write().await;
        let slot = tasks
            .get_mut(&task.id())
            .ok_or(StoreError::NotFound(task.id()))?;
        *slot = task.clone();
        Ok(())
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<Task>, StoreError> {
        Ok(self.tasks.read().await.get(&id).cloned())
    }

    async fn find_by_owner(
        &self,
        owner_id: &str,
        kind: Option<TaskKind>,
    ) -> Result<Vec<Task>, StoreError> {
        let mut tasks: Vec<Task> = self
            .tasks
            .read()
            .await
            .values()
            .filter(|t| t.owner_id() == owner_id)
            .filter(|t| kind.map_or(true, |k| t.kind() == k))
            .cloned()
            .collect();
        tasks.sort_by(|a, b| b.id().cmp(&a.id()));
        Ok(tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aigc_core::state_machine::TaskStatus;
    use assert_matches::assert_matches;

    fn new_task(owner: &str, kind: TaskKind) -> NewTask {
        NewTask {
            owner_id: owner.to_string(),
            kind,
            prompt: Some("a red fox".to_string()),
            input_asset: None,
            provider: None,
        }
    }

    #[tokio::test]
    async fn insert_assigns_increasing_ids_in_pending() {
        let store = InMemoryTaskStore::new();
        let a = store.insert(&new_task("u1", TaskKind::TextToImage)).await.unwrap();
        let b = store.insert(&new_task("u1", TaskKind::TextToImage)).await.unwrap();

        assert_eq!(a.id(), 1);
        assert_eq!(b.id(), 2);
        assert_eq!(a.status(), TaskStatus::Pending);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn update_replaces_whole_record() {
        let store = InMemoryTaskStore::new();
        let mut task = store.insert(&new_task("u1", TaskKind::TextToImage)).await.unwrap();

        task.start().unwrap();
        task.complete("https://cdn.example/1.png").unwrap();
        store.update(&task).await.unwrap();

        let found = store.find_by_id(task.id()).await.unwrap().unwrap();
        assert_eq!(found, task);
    }

    #[tokio::test]
    async fn update_of_unknown_task_is_not_found() {
        let store = InMemoryTaskStore::new();
        let other = InMemoryTaskStore::new();
        let task = other.insert(&new_task("u1", TaskKind::TextToImage)).await.unwrap();

        assert_matches!(store.update(&task).await, Err(StoreError::NotFound(1)));
    }

    #[tokio::test]
    async fn find_by_id_missing_is_none() {
        let store = InMemoryTaskStore::new();
        assert!(store.find_by_id(42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_by_owner_filters_and_orders_newest_first() {
        let store = InMemoryTaskStore::new();
        store.insert(&new_task("u1", TaskKind::TextToImage)).await.unwrap();
        store.insert(&new_task("u2", TaskKind::TextToImage)).await.unwrap();
        store.insert(&new_task("u1", TaskKind::FaceSwap)).await.unwrap();
        store.insert(&new_task("u1", TaskKind::TextToImage)).await.unwrap();

        let all: Vec<_> = store
            .find_by_owner("u1", None)
            .await
            .unwrap()
            .iter()
            .map(Task::id)
            .collect();
        assert_eq!(all, vec![4, 3, 1]);

        let t2i: Vec<_> = store
            .find_by_owner("u1", Some(TaskKind::TextToImage))
            .await
            .unwrap()
            .iter()
            .map(Task::id)
            .collect();
        assert_eq!(t2i, vec![4, 1]);

        assert!(store.find_by_owner("nobody", None).await.unwrap().is_empty());
    }
}
