use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use aigc_core::task::TaskKind;
use aigc_core::types::AssetRef;
use async_trait::async_trait;
use tokio::sync::{watch, Semaphore};

use crate::error::ProviderError;
use crate::provider::GenerationProvider;

/// What a [`MockProvider`] capability call does.
#[derive(Debug, Clone)]
pub enum MockOutcome {
    /// Return `mock://{KIND}/{n}`.
    Succeed,
    /// Return the given error.
    Fail(ProviderError),
    /// Return an empty asset reference.
    Empty,
    /// Panic inside the call.
    Panic,
}

/// A scripted provider for tests.
///
/// Every capability succeeds unless scripted otherwise with
/// [`MockProvider::with_outcome`]. A gated mock holds each call until
/// [`MockProvider::release`] hands it a permit, which lets tests observe
/// tasks while they are `PROCESSING` or pin down workers.
pub struct MockProvider {
    name: &'static str,
    outcomes: Mutex<HashMap<TaskKind, MockOutcome>>,
    gate: Option<Semaphore>,
    started: watch::Sender<usize>,
    finished: AtomicUsize,
}

impl MockProvider {
    pub fn new(name: &'static str) -> Self {
        let (started, _) = watch::channel(0);
        Self {
            name,
            outcomes: Mutex::new(HashMap::new()),
            gate: None,
            started,
            finished: AtomicUsize::new(0),
        }
    }

    /// A mock whose calls block until released.
    pub fn gated(name: &'static str) -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::new(name)
        }
    }

    pub fn with_outcome(self, kind: TaskKind, outcome: MockOutcome) -> Self {
        self.outcomes
            .lock()
            .expect("mock outcomes poisoned")
            .insert(kind, outcome);
        self
    }

    /// Let `n` gated calls proceed.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// Calls that have entered a capability, including ones still gated.
    pub fn started(&self) -> usize {
        *self.started.borrow()
    }

    /// Calls that have returned.
    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }

    /// Wait until at least `n` calls have entered a capability.
    pub async fn wait_for_started(&self, n: usize) {
        let mut rx = self.started.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|count| *count >= n).await;
    }

    async fn respond(&self, kind: TaskKind) -> Result<AssetRef, ProviderError> {
        let call = {
            let mut n = 0;
            self.started.send_modify(|count| {
                *count += 1;
                n = *count;
            });
            n
        };

        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .expect("mock gate closed")
                .forget();
        }

        let outcome = self
            .outcomes
            .lock()
            .expect("mock outcomes poisoned")
            .get(&kind)
            .cloned()
            .unwrap_or(MockOutcome::Succeed);
        self.finished.fetch_add(1, Ordering::SeqCst);

        match outcome {
            MockOutcome::Succeed => Ok(format!("mock://{kind}/{call}")),
            MockOutcome::Fail(err) => Err(err),
            MockOutcome::Empty => Ok(String::new()),
            MockOutcome::Panic => panic!("mock provider '{}' panicked on {kind}", self.name),
        }
    }
}

#[async_trait]
impl GenerationProvider for MockProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn generate_text_to_image(&self, _prompt: &str) -> Result<AssetRef, ProviderError> {
        self.respond(TaskKind::TextToImage).await
    }

    async fn generate_image_to_image(
        &self,
        _source: &str,
        _prompt: &str,
    ) -> Result<AssetRef, ProviderError> {
        self.respond(TaskKind::ImageToImage).await
    }

    async fn remove_background(&self, _source: &str) -> Result<AssetRef, ProviderError> {
        self.respond(TaskKind::BatchMatting).await
    }

    async fn swap_face(&self, _source: &str, _prompt: &str) -> Result<AssetRef, ProviderError> {
        self.respond(TaskKind::FaceSwap).await
    }
}
