//! Tencent Hunyuan provider.
//!
//! Text-to-image and image-to-image go to the configured Hunyuan gateway
//! when one is set. Hunyuan has no matting or face-swap endpoint, so those
//! two capabilities are always simulated. Request signing is left to the
//! gateway; the secret id/key are forwarded as headers.

use std::time::Duration;

use aigc_core::types::AssetRef;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::json;

use crate::config::HunyuanSettings;
use crate::error::ProviderError;
use crate::http::{extract_asset, GenerationHttpClient};
use crate::provider::{require, GenerationProvider};
use crate::simulated::Simulation;

pub const PROVIDER_NAME: &str = "hunyuan";

/// JSON pointer of the result URL in a Hunyuan response.
const RESULT_POINTER: &str = "/Response/ResultImage";

/// A live Hunyuan gateway connection.
#[derive(Debug, Clone)]
struct HunyuanBackend {
    http: GenerationHttpClient,
    secret_id: Option<String>,
    secret_key: Option<String>,
    region: String,
}

/// Hunyuan implementation of [`GenerationProvider`].
#[derive(Debug, Clone)]
pub struct HunyuanProvider {
    backend: Option<HunyuanBackend>,
    simulation: Simulation,
}

impl HunyuanProvider {
    /// Build from settings; without an endpoint every call is simulated.
    pub fn new(settings: &HunyuanSettings, http_timeout: Duration, simulated_latency: Duration) -> Self {
        let backend = settings.endpoint.clone().map(|endpoint| HunyuanBackend {
            http: GenerationHttpClient::new(endpoint, http_timeout),
            secret_id: settings.secret_id.clone(),
            secret_key: settings.secret_key.clone(),
            region: settings.region.clone(),
        });
        Self {
            backend,
            simulation: Simulation::new(PROVIDER_NAME, simulated_latency),
        }
    }

    /// A provider that only simulates.
    pub fn simulated(latency: Duration) -> Self {
        Self {
            backend: None,
            simulation: Simulation::new(PROVIDER_NAME, latency),
        }
    }

    pub fn is_simulated(&self) -> bool {
        self.backend.is_none()
    }
}

impl HunyuanBackend {
    async fn call(&self, action: &str, body: serde_json::Value) -> Result<AssetRef, ProviderError> {
        let headers = self.headers(action)?;
        let response = self.http.post_json("", headers, &body).await?;
        check_response_error(&response)?;
        extract_asset(&response, RESULT_POINTER)
    }

    fn headers(&self, action: &str) -> Result<HeaderMap, ProviderError> {
        let mut headers = HeaderMap::new();
        headers.insert("x-tc-action", header_value(action)?);
        headers.insert("x-tc-region", header_value(&self.region)?);
        headers.insert(
            "x-tc-requestid",
            header_value(&uuid::Uuid::new_v4().to_string())?,
        );
        if let Some(id) = &self.secret_id {
            headers.insert("x-tc-secretid", header_value(id)?);
        }
        if let Some(key) = &self.secret_key {
            headers.insert("x-tc-secretkey", header_value(key)?);
        }
        Ok(headers)
    }
}

fn header_value(value: &str) -> Result<HeaderValue, ProviderError> {
    HeaderValue::from_str(value)
        .map_err(|e| ProviderError::InvalidInput(format!("invalid header value: {e}")))
}

/// Hunyuan reports failures inside a 200 body as `Response.Error`.
fn check_response_error(response: &serde_json::Value) -> Result<(), ProviderError> {
    let Some(error) = response.pointer("/Response/Error") else {
        return Ok(());
    };
    let code = error.get("Code").and_then(|c| c.as_str()).unwrap_or("Unknown");
    let message = error
        .get("Message")
        .and_then(|m| m.as_str())
        .unwrap_or("no message");
    let detail = format!("{code}: {message}");

    Err(if code.starts_with("AuthFailure") {
        ProviderError::Authentication(detail)
    } else if code.contains("LimitExceeded") || code.starts_with("ResourceInsufficient") {
        ProviderError::QuotaExceeded(detail)
    } else {
        ProviderError::Api {
            status: 200,
            body: detail,
        }
    })
}

#[async_trait]
impl GenerationProvider for HunyuanProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn generate_text_to_image(&self, prompt: &str) -> Result<AssetRef, ProviderError> {
        let prompt = require("prompt", Some(prompt))?;
        match &self.backend {
            Some(backend) => {
                let body = json!({
                    "Prompts": [{ "Prompt": prompt, "RspImgType": "url" }],
                });
                backend.call("TextToImage", body).await
            }
            None => Ok(self.simulation.produce("text-to-image", 1.0).await),
        }
    }

    async fn generate_image_to_image(
        &self,
        source: &str,
        prompt: &str,
    ) -> Result<AssetRef, ProviderError> {
        let source = require("source image", Some(source))?;
        let prompt = require("prompt", Some(prompt))?;
        match &self.backend {
            Some(backend) => {
                let body = json!({
                    "Prompt": prompt,
                    "ImageUrl": source,
                    "RspImgType": "url",
                });
                backend.call("ImageToImage", body).await
            }
            None => Ok(self.simulation.produce("image-to-image", 1.0).await),
        }
    }

    async fn remove_background(&self, source: &str) -> Result<AssetRef, ProviderError> {
        require("source image", Some(source))?;
        Ok(self.simulation.produce("remove-background", 1.0).await)
    }

    async fn swap_face(&self, source: &str, prompt: &str) -> Result<AssetRef, ProviderError> {
        require("source image", Some(source))?;
        require("prompt", Some(prompt))?;
        Ok(self.simulation.produce("face-swap", 1.5).await)
    }
}
