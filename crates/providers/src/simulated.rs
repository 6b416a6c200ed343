//! Placeholder generation used when a backend is not configured.
//!
//! Sleeps for a configurable latency to mimic the real call and returns a
//! unique placeholder URL. Input validation still happens in the caller,
//! so a simulated provider fails exactly where a real one would.

use std::time::Duration;

use aigc_core::types::AssetRef;

/// Base URL of generated placeholder assets.
pub const PLACEHOLDER_BASE_URL: &str = "https://placeholder.aigc.local";

/// Simulated backend behaviour for one provider.
#[derive(Debug, Clone)]
pub struct Simulation {
    provider: &'static str,
    latency: Duration,
}

impl Simulation {
    pub fn new(provider: &'static str, latency: Duration) -> Self {
        Self { provider, latency }
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }

    /// Wait `latency * weight` and return a placeholder for `capability`.
    ///
    /// Heavier capabilities (face swap) pass a weight above 1.0.
    pub async fn produce(&self, capability: &str, weight: f64) -> AssetRef {
        let delay = self.latency.mul_f64(weight.max(0.0));
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        tracing::debug!(
            provider = self.provider,
            capability,
            delay_ms = delay.as_millis() as u64,
            "Simulated generation finished",
        );
        placeholder_url(self.provider, capability)
    }
}

/// Build a unique placeholder URL.
pub fn placeholder_url(provider: &str, capability: &str) -> AssetRef {
    format!(
        "{PLACEHOLDER_BASE_URL}/{provider}/{capability}/{}.png",
        uuid::Uuid::new_v4()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_urls_are_unique_and_tagged() {
        let a = placeholder_url("hunyuan", "face-swap");
        let b = placeholder_url("hunyuan", "face-swap");
        assert_ne!(a, b);
        assert!(a.starts_with("https://placeholder.aigc.local/hunyuan/face-swap/"));
        assert!(a.ends_with(".png"));
    }

    #[tokio::test(start_paused = true)]
    async fn produce_waits_for_weighted_latency() {
        let sim = Simulation::new("bailian", Duration::from_secs(2));
        let started = tokio::time::Instant::now();
        let url = sim.produce("face-swap", 1.5).await;

        assert!(started.elapsed() >= Duration::from_secs(3));
        assert!(url.contains("/bailian/face-swap/"));
    }

    #[tokio::test]
    async fn zero_latency_returns_immediately() {
        let sim = Simulation::new("hunyuan", Duration::ZERO);
        let url = sim.produce("text-to-image", 1.0).await;
        assert!(!url.is_empty());
    }
}
