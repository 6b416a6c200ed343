//! JSON-over-HTTP client shared by the provider variants.
//!
//! Wraps a [`reqwest::Client`] with the status-code mapping every provider
//! needs: 401/403 become [`ProviderError::Authentication`], 429 becomes
//! [`ProviderError::QuotaExceeded`], any other non-2xx becomes
//! [`ProviderError::Api`]. Result URLs are pulled out of the response body
//! with a JSON pointer.

use std::time::Duration;

use aigc_core::types::AssetRef;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;

use crate::error::ProviderError;

/// HTTP client for one provider endpoint.
#[derive(Debug, Clone)]
pub struct GenerationHttpClient {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl GenerationHttpClient {
    /// Create a client for `endpoint` with a per-request timeout.
    pub fn new(endpoint: String, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            timeout,
        }
    }

    /// Reuse an existing [`reqwest::Client`] (shares its connection pool).
    pub fn with_client(client: reqwest::Client, endpoint: String, timeout: Duration) -> Self {
        Self {
            client,
            endpoint,
            timeout,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST `body` to `{endpoint}{path}` and return the parsed JSON response.
    pub async fn post_json(
        &self,
        path: &str,
        headers: HeaderMap,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError> {
        let url = format!("{}{}", self.endpoint.trim_end_matches('/'), path);
        let response = self
            .client
            .post(&url)
            .headers(headers)
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let response = ensure_success(response).await?;
        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))
    }

    fn map_transport(&self, err: reqwest::Error) -> ProviderError {
        if err.is_timeout() {
            ProviderError::Timeout(self.timeout)
        } else {
            ProviderError::from(err)
        }
    }
}

/// Turn a non-2xx response into the matching [`ProviderError`].
async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string());
    Err(classify_status(status, body))
}

/// Map an error status code and body to a [`ProviderError`].
pub fn classify_status(status: StatusCode, body: String) -> ProviderError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::Authentication(body),
        StatusCode::TOO_MANY_REQUESTS => ProviderError::QuotaExceeded(body),
        other => ProviderError::Api {
            status: other.as_u16(),
            body,
        },
    }
}

/// Read a non-empty string at `pointer` (RFC 6901) from `body`.
pub fn extract_asset(body: &serde_json::Value, pointer: &str) -> Result<AssetRef, ProviderError> {
    body.pointer(pointer)
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            ProviderError::MalformedResponse(format!("no result asset at '{pointer}'"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn auth_statuses_map_to_authentication() {
        assert_matches!(
            classify_status(StatusCode::UNAUTHORIZED, "bad key".into()),
            ProviderError::Authentication(body) if body == "bad key"
        );
        assert_matches!(
            classify_status(StatusCode::FORBIDDEN, String::new()),
            ProviderError::Authentication(_)
        );
    }

    #[test]
    fn rate_limit_maps_to_quota() {
        assert_matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, "slow down".into()),
            ProviderError::QuotaExceeded(_)
        );
    }

    #[test]
    fn other_statuses_map_to_api_error() {
        assert_matches!(
            classify_status(StatusCode::BAD_GATEWAY, "upstream".into()),
            ProviderError::Api { status: 502, .. }
        );
    }

    #[test]
    fn extract_asset_reads_pointer() {
        let body = json!({ "Response": { "ResultImage": "https://cdn/x.png" } });
        assert_eq!(
            extract_asset(&body, "/Response/ResultImage").unwrap(),
            "https://cdn/x.png"
        );
    }

    #[test]
    fn extract_asset_rejects_missing_or_empty() {
        let empty = json!({ "Response": { "ResultImage": "" } });
        assert_matches!(
            extract_asset(&empty, "/Response/ResultImage"),
            Err(ProviderError::MalformedResponse(_))
        );
        assert_matches!(
            extract_asset(&json!({}), "/output/results/0/url"),
            Err(ProviderError::MalformedResponse(_))
        );
    }
}
