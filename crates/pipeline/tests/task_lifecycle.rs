//! End-to-end lifecycle tests: service -> dispatcher -> executor -> store.

use std::sync::Arc;
use std::time::Duration;

use aigc_core::error::CoreError;
use aigc_core::state_machine::TaskStatus;
use aigc_core::task::{CreateTask, Task, TaskKind};
use aigc_core::types::DbId;
use aigc_db::{InMemoryTaskStore, TaskStore};
use aigc_pipeline::{Admission, Dispatcher, EngineConfig, ServiceError, TaskExecutor, TaskService};
use aigc_providers::mock::{MockOutcome, MockProvider};
use aigc_providers::{ProviderError, ProviderName, ProviderRegistry};
use assert_matches::assert_matches;

struct Engine {
    store: Arc<InMemoryTaskStore>,
    service: TaskService,
}

fn engine(config: EngineConfig, hunyuan: Arc<MockProvider>, bailian: Arc<MockProvider>) -> Engine {
    let store = Arc::new(InMemoryTaskStore::new());
    let registry = ProviderRegistry::builder()
        .register(ProviderName::Hunyuan, hunyuan)
        .register(ProviderName::Bailian, bailian)
        .fallback(ProviderName::Hunyuan)
        .build()
        .unwrap();
    let executor = TaskExecutor::new(store.clone(), Arc::new(registry));
    let dispatcher = Dispatcher::start(config, executor);
    Engine {
        store: store.clone(),
        service: TaskService::new(store, dispatcher),
    }
}

fn pool(core: usize, max: usize, queue: usize) -> EngineConfig {
    EngineConfig {
        core_workers: core,
        max_workers: max,
        queue_capacity: queue,
        ..EngineConfig::default()
    }
}

fn text_to_image(provider: Option<&str>) -> CreateTask {
    CreateTask {
        kind: "TEXT_TO_IMAGE".to_string(),
        prompt: Some("a red fox".to_string()),
        provider: provider.map(str::to_string),
        owner_id: "user-7".to_string(),
        ..CreateTask::default()
    }
}

impl Engine {
    async fn stored(&self, id: DbId) -> Task {
        self.store.find_by_id(id).await.unwrap().unwrap()
    }

    async fn finish(&self) {
        self.service.dispatcher().shutdown().await;
    }
}

fn assert_terminal_invariants(task: &Task) {
    match task.status() {
        TaskStatus::Completed => {
            assert_matches!(task.result_asset(), Some(url) if !url.is_empty());
            assert_eq!(task.error_detail(), None);
        }
        TaskStatus::Failed => {
            assert_matches!(task.error_detail(), Some(msg) if !msg.is_empty());
            assert_eq!(task.result_asset(), None);
        }
        other => panic!("task {} is not terminal: {other}", task.id()),
    }
}

#[tokio::test]
async fn created_task_is_pending_before_a_worker_picks_it_up() {
    let hunyuan = Arc::new(MockProvider::gated("hunyuan-mock"));
    let engine = engine(pool(1, 1, 10), hunyuan.clone(), Arc::new(MockProvider::new("bailian-mock")));

    let first = engine.service.create_task(text_to_image(None)).await.unwrap();
    hunyuan.wait_for_started(1).await;

    // The only worker is busy, so the second task waits in the queue.
    let second = engine.service.create_task(text_to_image(None)).await.unwrap();
    assert_eq!(second.admission, Admission::Queued);
    assert_eq!(second.task.status(), TaskStatus::Pending);
    assert_eq!(
        engine.service.get_task(second.task_id).await.unwrap().status(),
        TaskStatus::Pending
    );
    assert_eq!(
        engine.service.get_task(first.task_id).await.unwrap().status(),
        TaskStatus::Processing
    );

    hunyuan.release(2);
    engine.finish().await;
    for id in [first.task_id, second.task_id] {
        let task = engine.stored(id).await;
        assert_eq!(task.status(), TaskStatus::Completed);
        assert_terminal_invariants(&task);
    }
}

#[tokio::test]
async fn observed_states_never_skip_processing() {
    let hunyuan = Arc::new(MockProvider::gated("hunyuan-mock"));
    let engine = engine(pool(1, 1, 10), hunyuan.clone(), Arc::new(MockProvider::new("bailian-mock")));

    let created = engine.service.create_task(text_to_image(None)).await.unwrap();
    let mut observed = vec![created.task.status()];

    hunyuan.wait_for_started(1).await;
    observed.push(engine.service.get_task(created.task_id).await.unwrap().status());

    hunyuan.release(1);
    engine.finish().await;
    observed.push(engine.stored(created.task_id).await.status());

    assert_eq!(
        observed,
        vec![TaskStatus::Pending, TaskStatus::Processing, TaskStatus::Completed]
    );
    for pair in observed.windows(2) {
        assert!(pair[0].can_transition_to(pair[1]));
    }
}

#[tokio::test]
async fn saturated_pool_makes_the_submitter_run_the_task() {
    let hunyuan = Arc::new(MockProvider::gated("hunyuan-mock"));
    let engine = engine(pool(1, 1, 1), hunyuan.clone(), Arc::new(MockProvider::new("bailian-mock")));

    let running = engine.service.create_task(text_to_image(None)).await.unwrap();
    hunyuan.wait_for_started(1).await;
    let queued = engine.service.create_task(text_to_image(None)).await.unwrap();
    assert_eq!(queued.admission, Admission::Queued);

    // One worker busy, one task queued: the third submission blocks its caller.
    let service = engine.service.clone();
    let submitter = tokio::spawn(async move { service.create_task(text_to_image(None)).await });
    hunyuan.wait_for_started(2).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!submitter.is_finished());

    hunyuan.release(3);
    let overflow = submitter.await.unwrap().unwrap();
    assert_eq!(overflow.admission, Admission::CallerRan);
    assert_eq!(overflow.task.status(), TaskStatus::Pending);
    assert_eq!(engine.stored(overflow.task_id).await.status(), TaskStatus::Completed);

    engine.finish().await;
    for id in [running.task_id, queued.task_id, overflow.task_id] {
        assert_terminal_invariants(&engine.stored(id).await);
    }
    assert_eq!(hunyuan.finished(), 3);
}

#[tokio::test]
async fn unknown_provider_selector_falls_back_and_completes() {
    let hunyuan = Arc::new(MockProvider::new("hunyuan-mock"));
    let bailian = Arc::new(MockProvider::new("bailian-mock"));
    let engine = engine(pool(2, 2, 10), hunyuan.clone(), bailian.clone());

    let created = engine
        .service
        .create_task(text_to_image(Some("unknown")))
        .await
        .unwrap();
    engine.finish().await;

    let task = engine.stored(created.task_id).await;
    assert_eq!(task.status(), TaskStatus::Completed);
    assert_eq!(task.provider(), Some("unknown"));
    assert_eq!(hunyuan.finished(), 1);
    assert_eq!(bailian.finished(), 0);
}

#[tokio::test]
async fn known_selector_routes_to_its_provider() {
    let hunyuan = Arc::new(MockProvider::new("hunyuan-mock"));
    let bailian = Arc::new(MockProvider::new("bailian-mock"));
    let engine = engine(pool(2, 2, 10), hunyuan.clone(), bailian.clone());

    engine.service.create_task(text_to_image(Some("ALIYUN"))).await.unwrap();
    engine.finish().await;

    assert_eq!(hunyuan.finished(), 0);
    assert_eq!(bailian.finished(), 1);
}

#[tokio::test]
async fn image_to_image_without_asset_creates_nothing() {
    let engine = engine(
        pool(1, 1, 1),
        Arc::new(MockProvider::new("hunyuan-mock")),
        Arc::new(MockProvider::new("bailian-mock")),
    );

    let result = engine
        .service
        .create_task(CreateTask {
            kind: "IMAGE_TO_IMAGE".to_string(),
            prompt: Some("make it blue".to_string()),
            input_asset: None,
            owner_id: "user-7".to_string(),
            ..CreateTask::default()
        })
        .await;

    assert_matches!(result, Err(ServiceError::Core(CoreError::Validation(_))));
    assert!(engine.store.is_empty().await);
    engine.finish().await;
}

#[tokio::test]
async fn failing_face_swap_records_the_error() {
    let hunyuan = Arc::new(MockProvider::new("hunyuan-mock").with_outcome(
        TaskKind::FaceSwap,
        MockOutcome::Fail(ProviderError::QuotaExceeded("monthly face-swap quota used".into())),
    ));
    let engine = engine(pool(1, 1, 1), hunyuan, Arc::new(MockProvider::new("bailian-mock")));

    let created = engine
        .service
        .create_task(CreateTask {
            kind: "FACE_SWAP".to_string(),
            prompt: Some("smile".to_string()),
            input_asset: Some("/uploads/face.png".to_string()),
            owner_id: "user-7".to_string(),
            ..CreateTask::default()
        })
        .await
        .unwrap();
    engine.finish().await;

    let task = engine.stored(created.task_id).await;
    assert_eq!(task.status(), TaskStatus::Failed);
    assert_matches!(task.error_detail(), Some(msg) if msg.contains("face-swap quota"));
    assert_eq!(task.result_asset(), None);
}

#[tokio::test]
async fn every_dispatched_task_ends_terminal() {
    let hunyuan = Arc::new(
        MockProvider::new("hunyuan-mock")
            .with_outcome(TaskKind::BatchMatting, MockOutcome::Panic)
            .with_outcome(TaskKind::ImageToImage, MockOutcome::Empty),
    );
    let engine = engine(pool(2, 4, 2), hunyuan, Arc::new(MockProvider::new("bailian-mock")));

    let mut ids = Vec::new();
    for kind in ["TEXT_TO_IMAGE", "IMAGE_TO_IMAGE", "BATCH_MATTING", "FACE_SWAP"].repeat(5) {
        let created = engine
            .service
            .create_task(CreateTask {
                kind: kind.to_string(),
                prompt: Some("anything".to_string()),
                input_asset: Some("/uploads/in.png".to_string()),
                owner_id: "user-7".to_string(),
                ..CreateTask::default()
            })
            .await
            .unwrap();
        ids.push(created.task_id);
    }
    engine.finish().await;

    assert_eq!(engine.store.len().await, 20);
    for id in ids {
        let task = engine.stored(id).await;
        assert_terminal_invariants(&task);
        let expected = match task.kind() {
            TaskKind::TextToImage | TaskKind::FaceSwap => TaskStatus::Completed,
            TaskKind::ImageToImage | TaskKind::BatchMatting => TaskStatus::Failed,
        };
        assert_eq!(task.status(), expected, "task {id} ({})", task.kind());
    }
}
