//! Generation provider abstraction.
//!
//! Every backend implements [`GenerationProvider`], the same four
//! capabilities regardless of vendor, so any provider can serve any task
//! kind. [`ProviderRegistry`] maps a task's provider selector to one of
//! the registered variants and falls back to a configured default for
//! selectors it does not recognise.

pub mod bailian;
pub mod config;
pub mod error;
pub mod http;
pub mod hunyuan;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod provider;
pub mod registry;
pub mod simulated;

pub use config::ProviderConfig;
pub use error::ProviderError;
pub use provider::{GenerationProvider, GenerationRequest};
pub use registry::{ProviderName, ProviderRegistry};
