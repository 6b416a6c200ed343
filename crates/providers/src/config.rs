use std::time::Duration;

use aigc_core::env;
use aigc_core::error::CoreError;

/// Credentials and endpoint for the Hunyuan backend.
#[derive(Debug, Clone, Default)]
pub struct HunyuanSettings {
    /// Image generation gateway. `None` runs the provider in simulated mode.
    pub endpoint: Option<String>,
    pub secret_id: Option<String>,
    pub secret_key: Option<String>,
    pub region: String,
}

/// Credentials and endpoint for the Bailian backend.
#[derive(Debug, Clone, Default)]
pub struct BailianSettings {
    /// Generation endpoint. `None` runs the provider in simulated mode.
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
}

/// Provider configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Selector used when a task names no provider or an unknown one.
    pub default_provider: String,
    pub hunyuan: HunyuanSettings,
    pub bailian: BailianSettings,
    /// Per-request HTTP timeout for real backends.
    pub http_timeout: Duration,
    /// Delay of a simulated call.
    pub simulated_latency: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            default_provider: "tencent".to_string(),
            hunyuan: HunyuanSettings {
                region: "ap-guangzhou".to_string(),
                ..HunyuanSettings::default()
            },
            bailian: BailianSettings::default(),
            http_timeout: Duration::from_secs(120),
            simulated_latency: Duration::from_millis(2000),
        }
    }
}

impl ProviderConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                         | Default          |
    /// |---------------------------------|------------------|
    /// | `AI_PROVIDER`                   | `tencent`        |
    /// | `HUNYUAN_ENDPOINT`              | unset (simulate) |
    /// | `HUNYUAN_SECRET_ID`             | unset            |
    /// | `HUNYUAN_SECRET_KEY`            | unset            |
    /// | `HUNYUAN_REGION`                | `ap-guangzhou`   |
    /// | `BAILIAN_ENDPOINT`              | unset (simulate) |
    /// | `BAILIAN_API_KEY`               | unset            |
    /// | `PROVIDER_HTTP_TIMEOUT_SECS`    | `120`            |
    /// | `PROVIDER_SIMULATED_LATENCY_MS` | `2000`           |
    pub fn from_env() -> Result<Self, CoreError> {
        let defaults = Self::default();

        Ok(Self {
            default_provider: env::string_or("AI_PROVIDER", &defaults.default_provider),
            hunyuan: HunyuanSettings {
                endpoint: env::string_opt("HUNYUAN_ENDPOINT"),
                secret_id: env::string_opt("HUNYUAN_SECRET_ID"),
                secret_key: env::string_opt("HUNYUAN_SECRET_KEY"),
                region: env::string_or("HUNYUAN_REGION", &defaults.hunyuan.region),
            },
            bailian: BailianSettings {
                endpoint: env::string_opt("BAILIAN_ENDPOINT"),
                api_key: env::string_opt("BAILIAN_API_KEY"),
            },
            http_timeout: Duration::from_secs(env::parse_or(
                "PROVIDER_HTTP_TIMEOUT_SECS",
                defaults.http_timeout.as_secs(),
            )?),
            simulated_latency: Duration::from_millis(env::parse_or(
                "PROVIDER_SIMULATED_LATENCY_MS",
                defaults.simulated_latency.as_millis() as u64,
            )?),
        })
    }
}
