//! Alibaba Cloud Bailian provider.
//!
//! All four capabilities go to one generation endpoint, distinguished by
//! the `task` field of the request body, authenticated with a bearer API
//! key. Without a configured endpoint every call is simulated.

use std::time::Duration;

use aigc_core::types::AssetRef;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::json;

use crate::config::BailianSettings;
use crate::error::ProviderError;
use crate::http::{extract_asset, GenerationHttpClient};
use crate::provider::{require, GenerationProvider};
use crate::simulated::Simulation;

pub const PROVIDER_NAME: &str = "bailian";

/// JSON pointer of the first result URL in a Bailian response.
const RESULT_POINTER: &str = "/output/results/0/url";

#[derive(Debug, Clone)]
struct BailianBackend {
    http: GenerationHttpClient,
    api_key: Option<String>,
}

/// Bailian implementation of [`GenerationProvider`].
#[derive(Debug, Clone)]
pub struct BailianProvider {
    backend: Option<BailianBackend>,
    simulation: Simulation,
}

impl BailianProvider {
    pub fn new(settings: &BailianSettings, http_timeout: Duration, simulated_latency: Duration) -> Self {
        let backend = settings.endpoint.clone().map(|endpoint| BailianBackend {
            http: GenerationHttpClient::new(endpoint, http_timeout),
            api_key: settings.api_key.clone(),
        });
        Self {
            backend,
            simulation: Simulation::new(PROVIDER_NAME, simulated_latency),
        }
    }

    pub fn simulated(latency: Duration) -> Self {
        Self {
            backend: None,
            simulation: Simulation::new(PROVIDER_NAME, latency),
        }
    }

    pub fn is_simulated(&self) -> bool {
        self.backend.is_none()
    }

    /// Run `task` against the backend, or simulate it with `weight`.
    async fn run(
        &self,
        task: &str,
        input: serde_json::Value,
        weight: f64,
    ) -> Result<AssetRef, ProviderError> {
        match &self.backend {
            Some(backend) => backend.call(task, input).await,
            None => Ok(self.simulation.produce(task, weight).await),
        }
    }
}

impl BailianBackend {
    async fn call(&self, task: &str, input: serde_json::Value) -> Result<AssetRef, ProviderError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = &self.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|e| ProviderError::Authentication(format!("unusable API key: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }

        let body = json!({ "task": task, "input": input });
        let response = self.http.post_json("", headers, &body).await?;

        if let Some(code) = response.get("code").and_then(|c| c.as_str()) {
            let message = response
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("no message");
            return Err(ProviderError::Api {
                status: 200,
                body: format!("{code}: {message}"),
            });
        }
        extract_asset(&response, RESULT_POINTER)
    }
}

#[async_trait]
impl GenerationProvider for BailianProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn generate_text_to_image(&self, prompt: &str) -> Result<AssetRef, ProviderError> {
        let prompt = require("prompt", Some(prompt))?;
        tracing::debug!(provider = PROVIDER_NAME, "Text-to-image requested");
        self.run("text-to-image", json!({ "prompt": prompt }), 1.0)
            .await
    }

    async fn generate_image_to_image(
        &self,
        source: &str,
        prompt: &str,
    ) -> Result<AssetRef, ProviderError> {
        let source = require("source image", Some(source))?;
        let prompt = require("prompt", Some(prompt))?;
        self.run(
            "image-to-image",
            json!({ "prompt": prompt, "image_url": source }),
            1.0,
        )
        .await
    }

    async fn remove_background(&self, source: &str) -> Result<AssetRef, ProviderError> {
        let source = require("source image", Some(source))?;
        self.run("remove-background", json!({ "image_url": source }), 1.0)
            .await
    }

    async fn swap_face(&self, source: &str, prompt: &str) -> Result<AssetRef, ProviderError> {
        let source = require("source image", Some(source))?;
        let prompt = require("prompt", Some(prompt))?;
        self.run(
            "face-swap",
            json!({ "prompt": prompt, "image_url": source }),
            1.5,
        )
        .await
    }
}
