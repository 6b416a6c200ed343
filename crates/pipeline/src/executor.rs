//! The per-task execution sequence run by dispatcher workers.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use aigc_core::task::Task;
use aigc_core::types::AssetRef;
use aigc_db::TaskStore;
use aigc_providers::{GenerationRequest, ProviderError, ProviderRegistry};
use futures::FutureExt;

/// Drives one task from `PENDING` to a terminal state.
///
/// Every fault (provider error, panic, timeout, empty result) ends as a
/// `FAILED` task with a diagnostic; nothing is returned to the submitter.
pub struct TaskExecutor {
    store: Arc<dyn TaskStore>,
    registry: Arc<ProviderRegistry>,
    provider_timeout: Option<Duration>,
}

impl TaskExecutor {
    pub fn new(store: Arc<dyn TaskStore>, registry: Arc<ProviderRegistry>) -> Self {
        Self {
            store,
            registry,
            provider_timeout: None,
        }
    }

    /// Limit every provider call to `limit`. `None` disables the limit.
    pub fn with_provider_timeout(mut self, limit: Option<Duration>) -> Self {
        self.provider_timeout = limit;
        self
    }

    /// Run `task` and return its final snapshot.
    ///
    /// The terminal state has been written to the store (or the write
    /// failure logged) by the time this returns.
    pub async fn execute(&self, mut task: Task) -> Task {
        let task_id = task.id();

        if let Err(e) = task.start() {
            tracing::error!(task_id, error = %e, "Task is not runnable, skipping");
            return task;
        }
        if let Err(e) = self.store.update(&task).await {
            tracing::error!(task_id, error = %e, "Failed to persist PROCESSING state");
            record_failure(&mut task, format!("Failed to persist task state: {e}"));
            self.persist(&task).await;
            return task;
        }

        tracing::info!(
            task_id,
            kind = %task.kind(),
            requested_provider = task.provider().unwrap_or("default"),
            "Task processing",
        );

        match self.generate(&task).await {
            Ok(asset) => {
                if let Err(e) = task.complete(asset) {
                    record_failure(&mut task, format!("Provider returned no result: {e}"));
                }
            }
            Err(e) => record_failure(&mut task, e.to_string()),
        }

        match task.error_detail() {
            None => tracing::info!(
                task_id,
                result = task.result_asset().unwrap_or_default(),
                "Task completed",
            ),
            Some(detail) => tracing::warn!(task_id, error = detail, "Task failed"),
        }
        self.persist(&task).await;
        task
    }

    async fn generate(&self, task: &Task) -> Result<AssetRef, ProviderError> {
        let provider = self.registry.resolve(task.provider());
        let request = GenerationRequest::from_task(task)?;
        tracing::debug!(task_id = task.id(), provider = provider.name(), "Invoking provider");

        let call = AssertUnwindSafe(request.dispatch(provider.as_ref())).catch_unwind();
        let outcome = match self.provider_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| ProviderError::Timeout(limit))?,
            None => call.await,
        };
        outcome.unwrap_or_else(|panic| Err(ProviderError::Panicked(panic_message(&*panic))))
    }

    async fn persist(&self, task: &Task) {
        if let Err(e) = self.store.update(task).await {
            tracing::error!(
                task_id = task.id(),
                status = %task.status(),
                error = %e,
                "Failed to persist terminal task state",
            );
        }
    }
}

fn record_failure(task: &mut Task, detail: String) {
    if let Err(e) = task.fail(detail) {
        tracing::error!(task_id = task.id(), error = %e, "Could not mark task failed");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
