use aigc_core::env;
use aigc_core::error::CoreError;
use axum::http::HeaderValue;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    pub fn from_env() -> Result<Self, CoreError> {
        let cors_origins = parse_origins(&env::string_or("CORS_ORIGINS", "http://localhost:5173"));

        let config = Self {
            host: env::string_or("HOST", "0.0.0.0"),
            port: env::parse_or("PORT", 3000)?,
            cors_origins,
            request_timeout_secs: env::parse_or("REQUEST_TIMEOUT_SECS", 30)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Every CORS origin must be usable as a header value.
    pub fn validate(&self) -> Result<(), CoreError> {
        for origin in &self.cors_origins {
            HeaderValue::from_str(origin).map_err(|e| {
                CoreError::Validation(format!("Invalid CORS origin '{origin}': {e}"))
            })?;
        }
        Ok(())
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
