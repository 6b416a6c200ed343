#![allow(dead_code)]

use std::sync::Arc;

use aigc_db::InMemoryTaskStore;
use aigc_pipeline::{Dispatcher, EngineConfig, TaskExecutor, TaskService};
use aigc_providers::mock::MockProvider;
use aigc_providers::{ProviderName, ProviderRegistry};
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use aigc_api::config::ServerConfig;
use aigc_api::middleware::owner::OWNER_HEADER;
use aigc_api::router::build_app_router;
use aigc_api::state::AppState;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
    }
}

/// A running application backed by the in-memory store.
pub struct TestApp {
    pub router: Router,
    pub service: TaskService,
    pub provider: Arc<MockProvider>,
}

/// Build the full application router over the in-memory store, with
/// `provider` registered as every provider variant.
///
/// Uses the same router builder as `main.rs`, so integration tests exercise
/// the production middleware stack.
pub fn build_test_app_with(provider: MockProvider) -> TestApp {
    let engine = EngineConfig {
        core_workers: 2,
        max_workers: 4,
        queue_capacity: 8,
        ..EngineConfig::default()
    };
    build_test_app_configured(provider, engine, test_config())
}

/// Like [`build_test_app_with`], with explicit pool sizing and server config.
pub fn build_test_app_configured(
    provider: MockProvider,
    engine: EngineConfig,
    config: ServerConfig,
) -> TestApp {
    let provider = Arc::new(provider);
    let store = Arc::new(InMemoryTaskStore::new());
    let registry = ProviderRegistry::builder()
        .register(ProviderName::Hunyuan, provider.clone())
        .register(ProviderName::Bailian, provider.clone())
        .fallback(ProviderName::Hunyuan)
        .build()
        .unwrap();
    let executor = TaskExecutor::new(store.clone(), Arc::new(registry));
    let dispatcher = Dispatcher::start(engine, executor);

    let service = TaskService::new(store, dispatcher);
    let state = AppState {
        config: Arc::new(config.clone()),
        tasks: service.clone(),
        pool: None,
    };

    TestApp {
        router: build_app_router(state, &config),
        service,
        provider,
    }
}

pub fn build_test_app() -> TestApp {
    build_test_app_with(MockProvider::new("mock"))
}

impl TestApp {
    /// Wait until every accepted task has been executed.
    pub async fn drain(&self) {
        self.service.dispatcher().shutdown().await;
    }
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

pub async fn get_as(app: &Router, owner: &str, uri: &str) -> Response<Body> {
    let request = Request::get(uri)
        .header(OWNER_HEADER, owner)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json_as(
    app: &Router,
    owner: Option<&str>,
    uri: &str,
    body: serde_json::Value,
) -> Response<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(owner) = owner {
        builder = builder.header(OWNER_HEADER, owner);
    }
    send(app, builder.body(Body::from(body.to_string())).unwrap()).await
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
