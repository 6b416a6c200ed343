//! Provider selection.
//!
//! Selectors are matched against a fixed table of names. Anything the
//! table does not recognise, including no selector at all, resolves to the
//! fallback variant; resolution never fails.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use aigc_core::error::CoreError;

use crate::bailian::BailianProvider;
use crate::config::ProviderConfig;
use crate::hunyuan::HunyuanProvider;
use crate::provider::GenerationProvider;

/// The known provider variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderName {
    Hunyuan,
    Bailian,
}

/// Accepted selector spellings, matched case-insensitively.
const SELECTORS: &[(&str, ProviderName)] = &[
    ("tencent", ProviderName::Hunyuan),
    ("hunyuan", ProviderName::Hunyuan),
    ("aliyun", ProviderName::Bailian),
    ("bailian", ProviderName::Bailian),
];

impl ProviderName {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderName::Hunyuan => crate::hunyuan::PROVIDER_NAME,
            ProviderName::Bailian => crate::bailian::PROVIDER_NAME,
        }
    }

    /// Look up a selector; `None` for unknown spellings.
    pub fn parse(selector: &str) -> Option<Self> {
        let selector = selector.trim();
        SELECTORS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(selector))
            .map(|(_, variant)| *variant)
    }
}

impl fmt::Display for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderName {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| CoreError::Validation(format!("Unknown provider: '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Maps selectors to provider instances.
#[derive(Clone)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderName, Arc<dyn GenerationProvider>>,
    fallback: ProviderName,
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.providers.keys().map(|n| n.as_str()).collect();
        names.sort_unstable();
        f.debug_struct("ProviderRegistry")
            .field("providers", &names)
            .field("fallback", &self.fallback)
            .finish()
    }
}

impl ProviderRegistry {
    pub fn builder() -> ProviderRegistryBuilder {
        ProviderRegistryBuilder::default()
    }

    /// Build both variants from configuration.
    ///
    /// The configured default selector must name a known variant.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, CoreError> {
        let fallback: ProviderName = config.default_provider.parse()?;

        let hunyuan = HunyuanProvider::new(
            &config.hunyuan,
            config.http_timeout,
            config.simulated_latency,
        );
        let bailian = BailianProvider::new(
            &config.bailian,
            config.http_timeout,
            config.simulated_latency,
        );
        tracing::info!(
            fallback = %fallback,
            hunyuan_simulated = hunyuan.is_simulated(),
            bailian_simulated = bailian.is_simulated(),
            "Provider registry configured",
        );

        Self::builder()
            .register(ProviderName::Hunyuan, Arc::new(hunyuan))
            .register(ProviderName::Bailian, Arc::new(bailian))
            .fallback(fallback)
            .build()
    }

    /// Resolve a task's provider selector.
    pub fn resolve(&self, selector: Option<&str>) -> Arc<dyn GenerationProvider> {
        let name = match selector.map(str::trim).filter(|s| !s.is_empty()) {
            None => self.fallback,
            Some(s) => match ProviderName::parse(s) {
                Some(name) if self.providers.contains_key(&name) => name,
                _ => {
                    tracing::warn!(
                        selector = s,
                        fallback = %self.fallback,
                        "Unknown provider selector, using fallback",
                    );
                    self.fallback
                }
            },
        };
        // `build` guarantees the fallback is registered.
        Arc::clone(&self.providers[&name])
    }

    pub fn fallback(&self) -> ProviderName {
        self.fallback
    }
}

/// Builder for [`ProviderRegistry`].
#[derive(Default)]
pub struct ProviderRegistryBuilder {
    providers: HashMap<ProviderName, Arc<dyn GenerationProvider>>,
    fallback: Option<ProviderName>,
}

impl ProviderRegistryBuilder {
    pub fn register(mut self, name: ProviderName, provider: Arc<dyn GenerationProvider>) -> Self {
        self.providers.insert(name, provider);
        self
    }

    pub fn fallback(mut self, name: ProviderName) -> Self {
        self.fallback = Some(name);
        self
    }

    /// Fails if no fallback was set or it is not registered.
    pub fn build(self) -> Result<ProviderRegistry, CoreError> {
        let fallback = self
            .fallback
            .ok_or_else(|| CoreError::Validation("Provider registry has no fallback".into()))?;
        if !self.providers.contains_key(&fallback) {
            return Err(CoreError::Validation(format!(
                "Fallback provider '{fallback}' is not registered"
            )));
        }
        Ok(ProviderRegistry {
            providers: self.providers,
            fallback,
        })
    }
}
