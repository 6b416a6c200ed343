use std::time::Duration;

/// Faults raised by a provider capability call.
///
/// All variants end up as the free-text `error_detail` of a failed task;
/// the variants exist so callers and tests can tell causes apart.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("Provider request failed: {0}")]
    Transport(String),

    /// The backend returned a non-2xx status code.
    #[error("Provider API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// Credentials were rejected.
    #[error("Provider authentication failed: {0}")]
    Authentication(String),

    /// The backend refused the call because a quota or rate limit was hit.
    #[error("Provider quota exceeded: {0}")]
    QuotaExceeded(String),

    /// The request is missing a field the capability needs.
    #[error("Invalid provider input: {0}")]
    InvalidInput(String),

    /// The backend answered 2xx but without a usable result.
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    /// The call did not finish within the configured time budget.
    #[error("Provider call timed out after {0:?}")]
    Timeout(Duration),

    /// The provider implementation panicked.
    #[error("Provider panicked: {0}")]
    Panicked(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Transport(err.to_string())
    }
}
