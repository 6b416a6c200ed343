//! Submission and query operations on tasks.

use std::sync::Arc;

use aigc_core::error::CoreError;
use aigc_core::task::{CreateTask, Task, TaskKind};
use aigc_core::types::DbId;
use aigc_db::TaskStore;

use crate::dispatcher::{Admission, Dispatcher};
use crate::error::ServiceError;

/// Result of an accepted create request.
#[derive(Debug, Clone)]
pub struct CreatedTask {
    pub task_id: DbId,
    /// The record as inserted, always `PENDING`.
    pub task: Task,
    pub admission: Admission,
}

/// Entry point for creating and polling tasks.
#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn TaskStore>,
    dispatcher: Arc<Dispatcher>,
}

impl TaskService {
    pub fn new(store: Arc<dyn TaskStore>, dispatcher: Arc<Dispatcher>) -> Self {
        Self { store, dispatcher }
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Validate, persist as `PENDING`, and hand off for execution.
    ///
    /// Validation failures create no record. Normally returns as soon as
    /// the task is queued; when the pool is saturated the caller runs the
    /// task and this returns after it is terminal. Either way the returned
    /// snapshot is the `PENDING` record as inserted.
    pub async fn create_task(&self, input: CreateTask) -> Result<CreatedTask, ServiceError> {
        let new = input.validate()?;
        let task = self.store.insert(&new).await?;
        let task_id = task.id();

        tracing::info!(
            task_id,
            owner_id = task.owner_id(),
            kind = %task.kind(),
            "Task created",
        );

        let snapshot = task.clone();
        let admission = self.dispatcher.submit(task).await;
        tracing::debug!(task_id, admission = %admission, "Task submitted");

        Ok(CreatedTask {
            task_id,
            task: snapshot,
            admission,
        })
    }

    /// Current snapshot of one task.
    pub async fn get_task(&self, id: DbId) -> Result<Task, ServiceError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::Core(CoreError::NotFound { entity: "Task", id }))
    }

    /// An owner's tasks, newest first. A blank `kind` means no filter.
    pub async fn list_tasks(
        &self,
        owner_id: &str,
        kind: Option<&str>,
    ) -> Result<Vec<Task>, ServiceError> {
        let kind = kind
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::parse::<TaskKind>)
            .transpose()?;
        Ok(self.store.find_by_owner(owner_id, kind).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::executor::TaskExecutor;
    use aigc_core::state_machine::TaskStatus;
    use aigc_db::InMemoryTaskStore;
    use aigc_providers::mock::MockProvider;
    use aigc_providers::{ProviderName, ProviderRegistry};
    use assert_matches::assert_matches;

    fn service() -> (Arc<InMemoryTaskStore>, TaskService) {
        let store = Arc::new(InMemoryTaskStore::new());
        let registry = ProviderRegistry::builder()
            .register(ProviderName::Bailian, Arc::new(MockProvider::new("mock")))
            .fallback(ProviderName::Bailian)
            .build()
            .unwrap();
        let executor = TaskExecutor::new(store.clone(), Arc::new(registry));
        let dispatcher = Dispatcher::start(EngineConfig::default(), executor);
        (store.clone(), TaskService::new(store, dispatcher))
    }

    fn request(owner: &str, kind: &str) -> CreateTask {
        CreateTask {
            kind: kind.to_string(),
            prompt: Some("portrait".to_string()),
            input_asset: Some("/uploads/me.png".to_string()),
            owner_id: owner.to_string(),
            ..CreateTask::default()
        }
    }

    #[tokio::test]
    async fn get_unknown_task_is_not_found() {
        let (_, service) = service();
        assert_matches!(
            service.get_task(42).await,
            Err(ServiceError::Core(CoreError::NotFound { entity: "Task", id: 42 }))
        );
    }

    #[tokio::test]
    async fn list_filters_by_kind_and_owner() {
        let (_, service) = service();
        service.create_task(request("alice", "TEXT_TO_IMAGE")).await.unwrap();
        service.create_task(request("alice", "face-swap")).await.unwrap();
        service.create_task(request("bob", "FACE_SWAP")).await.unwrap();

        let all = service.list_tasks("alice", None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all[0].id() > all[1].id());

        let swaps = service.list_tasks("alice", Some("FACE_SWAP")).await.unwrap();
        assert_eq!(swaps.len(), 1);
        assert_eq!(swaps[0].kind(), TaskKind::FaceSwap);

        assert_eq!(service.list_tasks("alice", Some(" ")).await.unwrap().len(), 2);
        service.dispatcher().shutdown().await;
    }

    #[tokio::test]
    async fn list_with_unknown_kind_is_validation_error() {
        let (_, service) = service();
        assert_matches!(
            service.list_tasks("alice", Some("VIDEO")).await,
            Err(ServiceError::Core(CoreError::Validation(_)))
        );
    }

    #[tokio::test]
    async fn created_snapshot_is_pending() {
        let (store, service) = service();
        let created = service.create_task(request("alice", "BATCH_MATTING")).await.unwrap();
        assert_eq!(created.task.status(), TaskStatus::Pending);
        assert_eq!(created.task.id(), created.task_id);

        service.dispatcher().shutdown().await;
        let stored = store.find_by_id(created.task_id).await.unwrap().unwrap();
        assert_eq!(stored.status(), TaskStatus::Completed);
    }
}
